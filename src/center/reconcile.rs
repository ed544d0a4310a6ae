//! Merging provider query results into the canonical tree.
//!
//! One pass: collect every province and prefecture, query the provider for
//! each with the node's name, match the node itself, then match its direct
//! children against everything the response contains below the match.
//! Failures are counted and logged; they never clear a center that an
//! earlier run resolved.

use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::audit::{audit, CoverageReport};
use super::index::NameMap;
use crate::amap::DistrictProvider;
use crate::models::{node_at_path_mut, Center, ProviderDistrict, RegionLevel, RegionNode};

/// Characters some source names carry as a marker, e.g. `仙桃市*`
pub const DECORATIVE_MARKERS: &[char] = &['*', '＊'];

/// Which rule matched the queried node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Code,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Provider returned an error or the request failed
    Query,
    /// Query succeeded but nothing in it matched the node
    Match,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetFailure {
    pub code: String,
    pub name: String,
    pub level: RegionLevel,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileStats {
    pub targets: usize,
    pub succeeded: usize,
    pub query_failures: usize,
    pub match_failures: usize,
    /// Queried nodes whose center was set
    pub nodes_updated: usize,
    /// Direct children whose center was set
    pub children_updated: usize,
    pub failures: Vec<TargetFailure>,
}

/// Result of a full pass
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub stats: ReconcileStats,
    /// Coverage of the whole tree after the pass
    pub coverage: CoverageReport,
}

/// Provider `subdistrict` depth for each queried level
#[derive(Debug, Clone, Copy)]
pub struct QueryDepths {
    pub province: u8,
    pub prefecture: u8,
}

impl Default for QueryDepths {
    fn default() -> Self {
        Self {
            province: 2,
            prefecture: 1,
        }
    }
}

impl QueryDepths {
    /// `None` for levels that are never queried directly
    pub fn for_level(&self, level: RegionLevel) -> Option<u8> {
        match level {
            RegionLevel::Province => Some(self.province),
            RegionLevel::Prefecture => Some(self.prefecture),
            RegionLevel::County => None,
        }
    }
}

/// Drives one reconciliation pass against a [`DistrictProvider`].
pub struct Reconciler<P> {
    provider: P,
    depths: QueryDepths,
    progress: ProgressBar,
}

impl<P: DistrictProvider> Reconciler<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            depths: QueryDepths::default(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_depths(mut self, depths: QueryDepths) -> Self {
        self.depths = depths;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Query every target once, merge results into `roots`, then audit.
    pub async fn run(&mut self, roots: &mut [RegionNode]) -> ReconcileOutcome {
        let targets = collect_targets(roots, &self.depths);
        info!("Collected {} query targets (province + prefecture)", targets.len());

        let mut stats = ReconcileStats {
            targets: targets.len(),
            ..ReconcileStats::default()
        };
        self.progress.set_length(targets.len() as u64);

        for path in &targets {
            self.progress.inc(1);

            // Paths were taken from this tree and nothing reshapes it during the pass
            let Some(node) = node_at_path_mut(roots, path) else {
                continue;
            };
            let Some(depth) = self.depths.for_level(node.level) else {
                continue;
            };

            match self.provider.query_division(&node.name, depth).await {
                Ok(districts) => apply_response(node, &districts, &mut stats),
                Err(e) => {
                    warn!("Query failed for {} ({}): {}", node.name, node.code, e);
                    record_failure(&mut stats, node, FailureKind::Query);
                }
            }

            self.progress.set_message(format!(
                "ok {} | node upd {} | child upd {}",
                stats.succeeded, stats.nodes_updated, stats.children_updated
            ));
        }
        self.progress.finish_with_message("Query phase complete");

        let coverage = audit(roots);
        info!(
            "Reconciled {} targets: {} matched, {} query failures, {} match failures",
            stats.targets, stats.succeeded, stats.query_failures, stats.match_failures
        );

        ReconcileOutcome { stats, coverage }
    }
}

/// Index paths of every queryable node, in pre-order.
pub fn collect_targets(roots: &[RegionNode], depths: &QueryDepths) -> Vec<Vec<usize>> {
    let mut targets = Vec::new();
    let mut path = Vec::new();
    for (idx, root) in roots.iter().enumerate() {
        path.push(idx);
        collect_into(root, depths, &mut path, &mut targets);
        path.pop();
    }
    targets
}

fn collect_into(
    node: &RegionNode,
    depths: &QueryDepths,
    path: &mut Vec<usize>,
    targets: &mut Vec<Vec<usize>>,
) {
    if depths.for_level(node.level).is_some() {
        targets.push(path.clone());
    }
    for (idx, child) in node.children.iter().enumerate() {
        path.push(idx);
        collect_into(child, depths, path, targets);
        path.pop();
    }
}

/// Pick the district that stands for `node` among the top-level results.
///
/// Rules in order: same code, then same name. The name rule also covers a
/// single result carrying the node's name; a lone result under a different
/// name is rejected.
pub fn match_district<'a>(
    node: &RegionNode,
    districts: &'a [ProviderDistrict],
) -> Option<(&'a ProviderDistrict, MatchRule)> {
    if let Some(d) = districts.iter().find(|d| d.adcode() == Some(node.code.as_str())) {
        return Some((d, MatchRule::Code));
    }
    districts
        .iter()
        .find(|d| d.name() == Some(node.name.as_str()))
        .map(|d| (d, MatchRule::Name))
}

/// Strip leading and trailing decorative markers from a name
pub fn strip_markers(name: &str) -> &str {
    name.trim_matches(DECORATIVE_MARKERS)
}

/// Look a child up by exact name, then by its undecorated name
pub fn match_child(names: &NameMap, child_name: &str) -> Option<Center> {
    names.get(child_name).or_else(|| {
        let clean = strip_markers(child_name);
        if clean != child_name {
            names.get(clean)
        } else {
            None
        }
    })
}

/// Merge one provider response into `node` and its direct children.
pub fn apply_response(node: &mut RegionNode, districts: &[ProviderDistrict], stats: &mut ReconcileStats) {
    let Some((matched, rule)) = match_district(node, districts) else {
        warn!(
            "No district matched {} ({}) among {} results",
            node.name,
            node.code,
            districts.len()
        );
        record_failure(stats, node, FailureKind::Match);
        return;
    };
    debug!("Matched {} ({}) by {:?}", node.name, node.code, rule);

    if let Some(center) = matched.parsed_center() {
        node.center = Some(center);
        stats.nodes_updated += 1;
    }

    // The response can nest deeper than requested, so flatten all of it
    let names = NameMap::build(&matched.districts);
    for child in &mut node.children {
        if let Some(center) = match_child(&names, &child.name) {
            child.center = Some(center);
            stats.children_updated += 1;
        }
    }

    stats.succeeded += 1;
}

fn record_failure(stats: &mut ReconcileStats, node: &RegionNode, kind: FailureKind) {
    match kind {
        FailureKind::Query => stats.query_failures += 1,
        FailureKind::Match => stats.match_failures += 1,
    }
    stats.failures.push(TargetFailure {
        code: node.code.clone(),
        name: node.name.clone(),
        level: node.level,
        kind,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amap::QueryError;
    use std::collections::HashMap;

    /// Canned responses keyed by keywords; unknown keywords fail like a dead endpoint.
    #[derive(Default)]
    struct StubProvider {
        responses: HashMap<String, Vec<ProviderDistrict>>,
        calls: Vec<(String, u8)>,
    }

    impl StubProvider {
        fn with(mut self, keywords: &str, districts: Vec<ProviderDistrict>) -> Self {
            self.responses.insert(keywords.to_string(), districts);
            self
        }
    }

    impl DistrictProvider for StubProvider {
        async fn query_division(
            &mut self,
            keywords: &str,
            depth: u8,
        ) -> Result<Vec<ProviderDistrict>, QueryError> {
            self.calls.push((keywords.to_string(), depth));
            self.responses
                .get(keywords)
                .cloned()
                .ok_or(QueryError::Status(500))
        }
    }

    fn center(lon: f64, lat: f64) -> Option<Center> {
        Center::new(lon, lat)
    }

    #[test]
    fn test_match_by_code_first() {
        let node = RegionNode::new("110000", "北京市", RegionLevel::Province);
        let districts = vec![
            ProviderDistrict::new("999999", "北京市", "1,1"),
            ProviderDistrict::new("110000", "Beijing", "2,2"),
        ];
        let (d, rule) = match_district(&node, &districts).unwrap();
        assert_eq!(rule, MatchRule::Code);
        assert_eq!(d.name(), Some("Beijing"));
    }

    #[test]
    fn test_match_by_name() {
        let node = RegionNode::new("11", "北京市", RegionLevel::Province);
        let districts = vec![
            ProviderDistrict::new("120000", "天津市", "1,1"),
            ProviderDistrict::new("110000", "北京市", "2,2"),
        ];
        let (d, rule) = match_district(&node, &districts).unwrap();
        assert_eq!(rule, MatchRule::Name);
        assert_eq!(d.adcode(), Some("110000"));
    }

    #[test]
    fn test_sole_result_with_same_name() {
        let node = RegionNode::new("429004", "仙桃市", RegionLevel::Prefecture);
        let districts = vec![ProviderDistrict::new("429000", "仙桃市", "113.45,30.36")];
        let (d, rule) = match_district(&node, &districts).unwrap();
        assert_eq!(rule, MatchRule::Name);
        assert_eq!(d.adcode(), Some("429000"));
    }

    #[test]
    fn test_sole_result_with_other_name_rejected() {
        let node = RegionNode::new("4290", "省直辖县级行政区划", RegionLevel::Prefecture);
        let districts = vec![ProviderDistrict::new("429004", "仙桃市", "113.45,30.36")];
        assert!(match_district(&node, &districts).is_none());
        assert!(match_district(&node, &[]).is_none());
    }

    #[test]
    fn test_child_marker_fallback() {
        let names = NameMap::build(&[ProviderDistrict::new("429004", "仙桃市", "113.45,30.36")]);
        assert_eq!(match_child(&names, "仙桃市*"), center(113.45, 30.36));
        assert_eq!(match_child(&names, "仙桃市"), center(113.45, 30.36));
        assert_eq!(match_child(&names, "天门市*"), None);
    }

    #[test]
    fn test_exact_child_name_preferred() {
        let names = NameMap::build(&[
            ProviderDistrict::new("1", "仙桃市*", "1,1"),
            ProviderDistrict::new("2", "仙桃市", "2,2"),
        ]);
        assert_eq!(match_child(&names, "仙桃市*"), center(1.0, 1.0));
    }

    #[test]
    fn test_match_failure_keeps_center() {
        let before = center(116.40, 39.90);
        let mut node = RegionNode::new("11", "北京市", RegionLevel::Province);
        node.center = before;

        let mut stats = ReconcileStats::default();
        apply_response(
            &mut node,
            &[ProviderDistrict::new("120000", "天津市", "117.19,39.12")],
            &mut stats,
        );

        assert_eq!(node.center, before);
        assert_eq!(stats.match_failures, 1);
        assert_eq!(stats.failures[0].kind, FailureKind::Match);
    }

    #[test]
    fn test_ambiguous_results_keep_center() {
        let before = center(116.40, 39.90);
        let mut node = RegionNode::new("11", "北京市", RegionLevel::Province)
            .with_children(vec![RegionNode::new("110101", "东城区", RegionLevel::County)]);
        node.center = before;

        // Neither candidate carries the node's code or name
        let districts = vec![
            ProviderDistrict::new("120000", "天津市", "117.19,39.12")
                .with_districts(vec![ProviderDistrict::new("120101", "东城区", "1,1")]),
            ProviderDistrict::new("130000", "河北省", "114.50,38.04"),
        ];
        assert!(match_district(&node, &districts).is_none());

        let mut stats = ReconcileStats::default();
        apply_response(&mut node, &districts, &mut stats);

        assert_eq!(node.center, before);
        assert_eq!(node.children[0].center, None);
        assert_eq!(stats.match_failures, 1);
        assert_eq!(stats.succeeded, 0);
        assert_eq!(stats.failures.len(), 1);
        assert_eq!(stats.failures[0].kind, FailureKind::Match);
        assert_eq!(stats.failures[0].code, "11");
    }

    #[test]
    fn test_malformed_center_keeps_previous() {
        let before = center(116.40, 39.90);
        let mut node = RegionNode::new("11", "北京市", RegionLevel::Province);
        node.center = before;

        let mut stats = ReconcileStats::default();
        apply_response(&mut node, &[ProviderDistrict::new("11", "北京市", "116.40")], &mut stats);

        assert_eq!(node.center, before);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.nodes_updated, 0);
    }

    #[test]
    fn test_children_only_direct() {
        let mut node = RegionNode::new("42", "湖北省", RegionLevel::Province).with_children(vec![
            RegionNode::new("4201", "武汉市", RegionLevel::Prefecture)
                .with_children(vec![RegionNode::new("420102", "江岸区", RegionLevel::County)]),
        ]);
        let response = vec![ProviderDistrict::new("420000", "湖北省", "114.34,30.55").with_districts(vec![
            ProviderDistrict::new("420100", "武汉市", "114.30,30.59").with_districts(vec![
                ProviderDistrict::new("420102", "江岸区", "114.31,30.60"),
            ]),
        ])];

        let mut stats = ReconcileStats::default();
        apply_response(&mut node, &response, &mut stats);

        assert_eq!(node.center, center(114.34, 30.55));
        assert_eq!(node.children[0].center, center(114.30, 30.59));
        assert!(node.children[0].children[0].center.is_none());
        assert_eq!(stats.children_updated, 1);
    }

    #[test]
    fn test_collect_targets_skips_counties() {
        let roots = vec![RegionNode::new("42", "湖北省", RegionLevel::Province).with_children(vec![
            RegionNode::new("4201", "武汉市", RegionLevel::Prefecture)
                .with_children(vec![RegionNode::new("420102", "江岸区", RegionLevel::County)]),
            RegionNode::new("4290", "省直辖县级行政区划", RegionLevel::Prefecture),
        ])];
        let targets = collect_targets(&roots, &QueryDepths::default());
        assert_eq!(targets, vec![vec![0], vec![0, 0], vec![0, 1]]);
    }

    #[tokio::test]
    async fn test_run_depths_and_failures() {
        let provider = StubProvider::default().with(
            "湖北省",
            vec![ProviderDistrict::new("420000", "湖北省", "114.34,30.55").with_districts(vec![
                ProviderDistrict::new("429004", "仙桃市", "113.45,30.36"),
            ])],
        );
        let mut roots = vec![RegionNode::new("42", "湖北省", RegionLevel::Province).with_children(vec![
            RegionNode::new("4201", "武汉市", RegionLevel::Prefecture)
                .with_center(Center::new(114.30, 30.59).unwrap()),
            RegionNode::new("429004", "仙桃市*", RegionLevel::Prefecture),
        ])];

        let mut reconciler = Reconciler::new(provider);
        let outcome = reconciler.run(&mut roots).await;

        assert_eq!(
            reconciler.provider().calls,
            vec![
                ("湖北省".to_string(), 2),
                ("武汉市".to_string(), 1),
                ("仙桃市*".to_string(), 1),
            ]
        );
        assert_eq!(outcome.stats.targets, 3);
        assert_eq!(outcome.stats.succeeded, 1);
        assert_eq!(outcome.stats.query_failures, 2);

        // Failed query for 武汉市 does not erase its earlier center
        assert_eq!(roots[0].children[0].center, center(114.30, 30.59));
        assert_eq!(roots[0].children[1].center, center(113.45, 30.36));
        assert_eq!(outcome.coverage.total, 3);
        assert!(outcome.coverage.is_complete());
    }
}
