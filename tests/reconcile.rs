use std::collections::HashMap;

use xzqh::amap::{DistrictProvider, QueryError};
use xzqh::center::{annotate_all, audit, normalize, CenterIndex, Reconciler};
use xzqh::export::{find_by_name, read_table, write_table};
use xzqh::source::{load_tree, save_tree, select_source};
use xzqh::{Center, ProviderDistrict, RegionLevel, RegionNode};

struct StubProvider {
    responses: HashMap<(String, u8), Vec<ProviderDistrict>>,
}

impl DistrictProvider for StubProvider {
    async fn query_division(
        &mut self,
        keywords: &str,
        depth: u8,
    ) -> Result<Vec<ProviderDistrict>, QueryError> {
        self.responses
            .get(&(keywords.to_string(), depth))
            .cloned()
            .ok_or(QueryError::Status(404))
    }
}

fn beijing_provider() -> StubProvider {
    let mut responses = HashMap::new();
    responses.insert(
        ("北京市".to_string(), 2),
        vec![ProviderDistrict::new("11", "北京市", "116.40,39.90").with_districts(vec![
            ProviderDistrict::new("110101", "东城区", "116.41,39.93"),
        ])],
    );
    StubProvider { responses }
}

fn beijing_tree() -> Vec<RegionNode> {
    vec![RegionNode::new("11", "北京市", RegionLevel::Province)
        .with_children(vec![RegionNode::new("110101", "东城区", RegionLevel::County)])]
}

#[tokio::test]
async fn beijing_end_to_end() {
    let mut roots = beijing_tree();

    let outcome = Reconciler::new(beijing_provider()).run(&mut roots).await;

    assert_eq!(roots[0].center, Center::new(116.40, 39.90));
    assert_eq!(roots[0].children[0].center, Center::new(116.41, 39.93));
    assert_eq!(outcome.stats.succeeded, 1);
    assert_eq!(outcome.stats.children_updated, 1);
    assert_eq!(outcome.coverage.total, 2);
    assert!(outcome.coverage.missing.is_empty());
}

#[tokio::test]
async fn resumed_run_keeps_earlier_centers() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("xzqh_2023_tree.json");
    let checkpoint = dir.path().join("xzqh_with_amap_coordinates.json");
    save_tree(&original, &beijing_tree()).unwrap();

    // First run starts from the original and writes the checkpoint
    let source = select_source(false, &original, &checkpoint).unwrap();
    assert!(!source.is_resume());
    let mut roots = load_tree(source.path()).unwrap();
    Reconciler::new(beijing_provider()).run(&mut roots).await;
    save_tree(&checkpoint, &normalize(&roots)).unwrap();

    // Second run resumes, but the provider is down
    let source = select_source(false, &original, &checkpoint).unwrap();
    assert!(source.is_resume());
    let mut roots = load_tree(source.path()).unwrap();
    let dead = StubProvider {
        responses: HashMap::new(),
    };
    let outcome = Reconciler::new(dead).run(&mut roots).await;

    assert_eq!(outcome.stats.query_failures, 1);
    assert_eq!(roots[0].center, Center::new(116.40, 39.90));
    assert_eq!(roots[0].children[0].center, Center::new(116.41, 39.93));
    assert!(outcome.coverage.is_complete());

    // --force goes back to the pristine tree
    let forced = select_source(true, &original, &checkpoint).unwrap();
    let pristine = load_tree(forced.path()).unwrap();
    assert_eq!(audit(&pristine).covered, 0);
}

#[test]
fn offline_dump_then_binary_table() {
    let dir = tempfile::tempdir().unwrap();
    let dump = ProviderDistrict::new("110000", "北京市", "116.407387,39.904179").with_districts(vec![
        ProviderDistrict::new("110100", "北京城区", "116.405285,39.904989").with_districts(vec![
            ProviderDistrict::new("110101", "东城区", "116.418757,39.917544"),
        ]),
    ]);

    let roots = vec![RegionNode::new("110000", "北京市", RegionLevel::Province).with_children(vec![
        RegionNode::new("110101", "东城区", RegionLevel::County),
        RegionNode::new("110102", "西城区", RegionLevel::County),
    ])];
    let annotated = annotate_all(&roots, &CenterIndex::build(&dump));

    let report = audit(&annotated);
    assert_eq!(report.total, 3);
    assert_eq!(report.covered, 2);
    assert_eq!(report.missing[0].display_path(), "北京市/西城区");

    let path = dir.path().join("xzqh.bin");
    write_table(&path, &annotated).unwrap();
    let table = read_table(&path).unwrap();

    assert_eq!(table.to_roots().unwrap(), annotated);
    let hits = find_by_name(&table, "东城区");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].display_path(), "北京市 -> 东城区");
    assert_eq!(hits[0].center.unwrap().longitude, 116.418757);
}
