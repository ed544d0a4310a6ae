//! Coverage reporting for annotated trees.

use serde::Serialize;

use crate::models::{RegionLevel, RegionNode};

/// A node without a center
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingRegion {
    /// Ancestor names from the root down to and including this node
    pub path: Vec<String>,
    pub code: String,
    pub name: String,
    pub level: RegionLevel,
}

impl MissingRegion {
    /// Path joined with `/`, e.g. `湖北省/仙桃市*`
    pub fn display_path(&self) -> String {
        self.path.join("/")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageReport {
    pub total: usize,
    pub covered: usize,
    pub missing: Vec<MissingRegion>,
}

impl CoverageReport {
    /// Covered fraction in `[0, 1]`; an empty tree counts as fully covered
    pub fn ratio(&self) -> f64 {
        ratio(self.covered, self.total)
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Walk `roots` in pre-order and report coverage.
pub fn audit(roots: &[RegionNode]) -> CoverageReport {
    let mut report = CoverageReport::default();
    let mut path = Vec::new();
    for root in roots {
        audit_node(root, &mut path, &mut report);
    }
    report
}

fn audit_node(node: &RegionNode, path: &mut Vec<String>, report: &mut CoverageReport) {
    path.push(node.name.clone());

    report.total += 1;
    if node.center.is_some() {
        report.covered += 1;
    } else {
        report.missing.push(MissingRegion {
            path: path.clone(),
            code: node.code.clone(),
            name: node.name.clone(),
            level: node.level,
        });
    }

    for child in &node.children {
        audit_node(child, path, report);
    }

    path.pop();
}

/// Coverage of two versions of the same hierarchy side by side.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageComparison {
    pub baseline_total: usize,
    pub baseline_covered: usize,
    pub current_total: usize,
    pub current_covered: usize,
}

impl CoverageComparison {
    pub fn new(baseline: &CoverageReport, current: &CoverageReport) -> Self {
        Self {
            baseline_total: baseline.total,
            baseline_covered: baseline.covered,
            current_total: current.total,
            current_covered: current.covered,
        }
    }

    /// Nodes covered now that were not before (may be negative)
    pub fn newly_covered(&self) -> i64 {
        self.current_covered as i64 - self.baseline_covered as i64
    }

    /// Change in coverage ratio, in percentage points
    pub fn ratio_delta(&self) -> f64 {
        (ratio(self.current_covered, self.current_total)
            - ratio(self.baseline_covered, self.baseline_total))
            * 100.0
    }
}

fn ratio(covered: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        covered as f64 / total as f64
    }
}
