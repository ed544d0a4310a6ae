//! Canonical administrative-division tree.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Administrative tier of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RegionLevel {
    /// Province, autonomous region or municipality (省级)
    Province,
    /// Prefecture-level city or league (地级)
    Prefecture,
    /// County, district or county-level city (县级)
    County,
}

impl RegionLevel {
    /// Get all levels in hierarchical order (province first)
    pub fn all() -> &'static [RegionLevel] {
        &[
            RegionLevel::Province,
            RegionLevel::Prefecture,
            RegionLevel::County,
        ]
    }

    /// Name used in JSON files
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionLevel::Province => "province",
            RegionLevel::Prefecture => "prefecture",
            RegionLevel::County => "county",
        }
    }

    /// Numeric tag used in the binary table
    pub fn to_table_code(&self) -> u8 {
        match self {
            RegionLevel::Province => 0,
            RegionLevel::Prefecture => 1,
            RegionLevel::County => 2,
        }
    }

    pub fn from_table_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RegionLevel::Province),
            1 => Some(RegionLevel::Prefecture),
            2 => Some(RegionLevel::County),
            _ => None,
        }
    }
}

impl fmt::Display for RegionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Geographic center of a region (WGS-84 / GCJ-02 as delivered by the provider)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub longitude: f64,
    pub latitude: f64,
}

impl Center {
    /// Build a center, rejecting NaN and infinite components.
    pub fn new(longitude: f64, latitude: f64) -> Option<Self> {
        if longitude.is_finite() && latitude.is_finite() {
            Some(Self {
                longitude,
                latitude,
            })
        } else {
            None
        }
    }

    /// Parse a provider coordinate string of the form `"lon,lat"`.
    ///
    /// Anything that does not split into exactly two finite floats yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(',');
        let lon = parts.next()?.trim().parse::<f64>().ok()?;
        let lat = parts.next()?.trim().parse::<f64>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(lon, lat)
    }

    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

/// One node of the province → prefecture → county hierarchy.
///
/// Empty `children` are never written: the field is omitted instead, so a
/// persisted node either has no `children` key or at least one child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionNode {
    /// Administrative code, primary join key
    #[serde(deserialize_with = "code_from_string_or_number")]
    pub code: String,

    /// Display name, may carry a decorative suffix such as `*`
    pub name: String,

    pub level: RegionLevel,

    /// Resolved center, absent until a provider supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Center>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RegionNode>,
}

impl RegionNode {
    pub fn new(code: impl Into<String>, name: impl Into<String>, level: RegionLevel) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            level,
            center: None,
            children: Vec::new(),
        }
    }

    pub fn with_center(mut self, center: Center) -> Self {
        self.center = Some(center);
        self
    }

    pub fn with_children(mut self, children: Vec<RegionNode>) -> Self {
        self.children = children;
        self
    }

    /// Visit this node and every descendant in pre-order.
    ///
    /// The callback receives the node and its depth (0 for `self`).
    pub fn for_each_descendant<F>(&self, f: &mut F)
    where
        F: FnMut(&RegionNode, usize),
    {
        self.visit(0, f);
    }

    fn visit<F>(&self, depth: usize, f: &mut F)
    where
        F: FnMut(&RegionNode, usize),
    {
        f(self, depth);
        for child in &self.children {
            child.visit(depth + 1, f);
        }
    }

    /// Rebuild the children with `f`, dropping the collection if it ends up empty.
    pub fn map_children<F>(mut self, f: F) -> Self
    where
        F: FnMut(RegionNode) -> RegionNode,
    {
        let children = std::mem::take(&mut self.children);
        self.children = children.into_iter().map(f).collect();
        self
    }

    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(RegionNode::node_count).sum::<usize>()
    }

    /// Follow a path of child indices from this node.
    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut RegionNode> {
        let mut node = self;
        for &idx in path {
            node = node.children.get_mut(idx)?;
        }
        Some(node)
    }
}

/// Resolve an index path (root index first) inside a forest.
pub fn node_at_path_mut<'a>(roots: &'a mut [RegionNode], path: &[usize]) -> Option<&'a mut RegionNode> {
    let (first, rest) = path.split_first()?;
    roots.get_mut(*first)?.descendant_mut(rest)
}

/// Count every node reachable from `roots`
pub fn forest_size(roots: &[RegionNode]) -> usize {
    roots.iter().map(RegionNode::node_count).sum()
}

// Some exports of the national tree carry codes as JSON numbers.
fn code_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Text(String),
        Number(u64),
    }

    Ok(match RawCode::deserialize(deserializer)? {
        RawCode::Text(s) => s,
        RawCode::Number(n) => n.to_string(),
    })
}
