//! Coordinate matching between the canonical tree and provider data.
//!
//! - [`index`] flattens provider trees into code- and name-keyed lookups
//! - [`annotate`] rebuilds a tree with centers attached
//! - [`audit`] reports coverage
//! - [`reconcile`] drives provider queries and merges the results

pub mod annotate;
pub mod audit;
pub mod index;
pub mod reconcile;

pub use annotate::{annotate, annotate_all, normalize};
pub use audit::{audit, CoverageComparison, CoverageReport, MissingRegion};
pub use index::{CenterIndex, CenterLookup, IndexedCenter, NameMap, NoLookup};
pub use reconcile::{
    apply_response, collect_targets, match_child, match_district, strip_markers, FailureKind,
    MatchRule, QueryDepths, ReconcileOutcome, ReconcileStats, Reconciler, TargetFailure,
};
