//! Bottom-up rebuild of the canonical tree with centers attached.

use super::index::{CenterLookup, NoLookup};
use crate::models::{Center, RegionNode};

/// Rebuild `node` with centers resolved through `lookup`.
///
/// Children are finished before their parent. The output keeps only
/// `code`, `name`, `level`, a center when one is known and non-empty
/// children. A lookup miss keeps the node's existing valid center, so
/// running this over an already annotated tree changes nothing.
pub fn annotate<L: CenterLookup + ?Sized>(node: &RegionNode, lookup: &L) -> RegionNode {
    let children: Vec<RegionNode> = node
        .children
        .iter()
        .map(|child| annotate(child, lookup))
        .collect();

    let center = lookup
        .lookup(node)
        .or(node.center)
        .filter(Center::is_valid);

    RegionNode {
        code: node.code.clone(),
        name: node.name.clone(),
        level: node.level,
        center,
        children,
    }
}

/// Annotate every root of a forest
pub fn annotate_all<L: CenterLookup + ?Sized>(roots: &[RegionNode], lookup: &L) -> Vec<RegionNode> {
    roots.iter().map(|root| annotate(root, lookup)).collect()
}

/// Cleanup pass before persistence: drops invalid centers and empty children.
pub fn normalize(roots: &[RegionNode]) -> Vec<RegionNode> {
    annotate_all(roots, &NoLookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::center::index::{CenterIndex, NameMap};
    use crate::models::{ProviderDistrict, RegionLevel};

    fn hubei() -> RegionNode {
        RegionNode::new("42", "湖北省", RegionLevel::Province).with_children(vec![
            RegionNode::new("4201", "武汉市", RegionLevel::Prefecture).with_children(vec![
                RegionNode::new("420102", "江岸区", RegionLevel::County),
                RegionNode::new("420103", "江汉区", RegionLevel::County),
            ]),
            RegionNode::new("429004", "仙桃市*", RegionLevel::Prefecture),
        ])
    }

    fn provider() -> ProviderDistrict {
        ProviderDistrict::new("42", "湖北省", "114.34,30.55").with_districts(vec![
            ProviderDistrict::new("4201", "武汉市", "114.30,30.59").with_districts(vec![
                ProviderDistrict::new("420102", "江岸区", "114.31,30.60"),
            ]),
            ProviderDistrict::new("429004", "仙桃市", "113.45,30.36"),
        ])
    }

    fn check_invariants(node: &RegionNode) {
        node.for_each_descendant(&mut |n, _| {
            if let Some(center) = n.center {
                assert!(center.longitude.is_finite() && center.latitude.is_finite());
            }
            let json = serde_json::to_value(n).unwrap();
            if let Some(children) = json.get("children") {
                assert!(!children.as_array().unwrap().is_empty());
            }
        });
    }

    #[test]
    fn test_annotate_by_code() {
        let index = CenterIndex::build(&provider());
        let out = annotate(&hubei(), &index);

        assert_eq!(out.center, Center::new(114.34, 30.55));
        assert_eq!(out.children[0].children[0].center, Center::new(114.31, 30.60));
        assert!(out.children[0].children[1].center.is_none());
        // Code join does not care about the decorated name
        assert_eq!(out.children[1].center, Center::new(113.45, 30.36));
        check_invariants(&out);
    }

    #[test]
    fn test_annotate_by_name_is_exact() {
        let names = NameMap::build(&[provider()]);
        let out = annotate(&hubei(), &names);

        assert!(out.center.is_some());
        assert!(out.children[0].center.is_some());
        assert!(out.children[1].center.is_none());
    }

    #[test]
    fn test_annotate_is_idempotent() {
        let index = CenterIndex::build(&provider());
        let once = annotate(&hubei(), &index);
        let twice = annotate(&once, &index);
        assert_eq!(once, twice);
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn test_miss_keeps_existing_center() {
        let node = RegionNode::new("11", "北京市", RegionLevel::Province)
            .with_center(Center::new(116.40, 39.90).unwrap());
        let out = annotate(&node, &NoLookup);
        assert_eq!(out.center, node.center);
    }

    #[test]
    fn test_normalize_drops_invalid_center() {
        let mut node = RegionNode::new("11", "北京市", RegionLevel::Province);
        node.center = Some(Center {
            longitude: f64::NAN,
            latitude: 39.9,
        });
        let out = normalize(&[node]);
        assert!(out[0].center.is_none());
        check_invariants(&out[0]);
    }
}
