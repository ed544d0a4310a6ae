//! Flat lookups built from provider district trees.

use std::collections::HashMap;
use tracing::debug;

use crate::models::{Center, ProviderDistrict, RegionNode};

/// Entry of a [`CenterIndex`]
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedCenter {
    pub name: Option<String>,
    pub center: Center,
    /// Provider level string ("province", "city", "district", "street", ...)
    pub level: Option<String>,
}

/// Administrative code → center, flattened from a provider tree of any depth.
#[derive(Debug, Clone, Default)]
pub struct CenterIndex {
    entries: HashMap<String, IndexedCenter>,
    /// Districts skipped because their center did not parse
    malformed: usize,
}

impl CenterIndex {
    /// Flatten one provider tree.
    ///
    /// Districts without a code or with an unparseable center are skipped.
    /// A repeated code overwrites the earlier entry.
    pub fn build(root: &ProviderDistrict) -> Self {
        let mut index = Self::default();
        index.insert_tree(root);
        index
    }

    /// Flatten several provider trees into one index, later trees win
    pub fn build_all(roots: &[ProviderDistrict]) -> Self {
        let mut index = Self::default();
        for root in roots {
            index.merge(Self::build(root));
        }
        index
    }

    fn insert_tree(&mut self, district: &ProviderDistrict) {
        if let Some(code) = district.adcode() {
            match district.parsed_center() {
                Some(center) => {
                    self.entries.insert(
                        code.to_string(),
                        IndexedCenter {
                            name: district.name().map(str::to_string),
                            center,
                            level: district.level.clone(),
                        },
                    );
                }
                None => {
                    debug!("Skipping district {} without usable center", code);
                    self.malformed += 1;
                }
            }
        }

        for sub in &district.districts {
            self.insert_tree(sub);
        }
    }

    /// Absorb another index, later entries win
    pub fn merge(&mut self, other: CenterIndex) {
        self.malformed += other.malformed;
        self.entries.extend(other.entries);
    }

    pub fn get(&self, code: &str) -> Option<&IndexedCenter> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

/// Name → center, flattened from provider districts of any depth.
///
/// Degraded join used when codes differ between sources (offline dumps) and
/// for the children of a queried node.
#[derive(Debug, Clone, Default)]
pub struct NameMap {
    entries: HashMap<String, Center>,
}

impl NameMap {
    /// Flatten every district in `districts` and all of their descendants.
    pub fn build(districts: &[ProviderDistrict]) -> Self {
        let mut map = Self::default();
        map.insert_all(districts);
        map
    }

    fn insert_all(&mut self, districts: &[ProviderDistrict]) {
        for district in districts {
            if let (Some(name), Some(center)) = (district.name(), district.parsed_center()) {
                self.entries.insert(name.to_string(), center);
            }
            self.insert_all(&district.districts);
        }
    }

    pub fn get(&self, name: &str) -> Option<Center> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of centers for [`annotate`](super::annotate).
pub trait CenterLookup {
    fn lookup(&self, node: &RegionNode) -> Option<Center>;
}

impl CenterLookup for CenterIndex {
    fn lookup(&self, node: &RegionNode) -> Option<Center> {
        self.get(&node.code).map(|entry| entry.center)
    }
}

impl CenterLookup for NameMap {
    fn lookup(&self, node: &RegionNode) -> Option<Center> {
        self.get(&node.name)
    }
}

/// Lookup that never resolves anything; used for the cleanup-only pass.
pub struct NoLookup;

impl CenterLookup for NoLookup {
    fn lookup(&self, _node: &RegionNode) -> Option<Center> {
        None
    }
}
