//! Lookups over a loaded [`DataTable`].

use serde::Serialize;

use super::table::{Coordinate, DataTable, RegionTable};

/// A region found in the table, with the names above it
#[derive(Debug, Clone, Serialize)]
pub struct RegionHit {
    /// Names from the province down to the hit, inclusive
    pub path: Vec<String>,
    pub code: String,
    pub name: String,
    pub level: u8,
    pub center: Option<Coordinate>,
}

impl RegionHit {
    /// e.g. `北京市 -> 东城区`
    pub fn display_path(&self) -> String {
        self.path.join(" -> ")
    }
}

/// Every region whose name equals `name` exactly.
///
/// Names repeat across provinces (朝阳区 exists in Beijing and Changchun),
/// so all hits are returned in pre-order.
pub fn find_by_name(table: &DataTable, name: &str) -> Vec<RegionHit> {
    let mut hits = Vec::new();
    let mut path = Vec::new();
    for region in &table.root {
        walk(region, &mut path, &mut |r, p| {
            if r.name == name {
                hits.push(hit(r, p));
            }
        });
    }
    hits
}

/// The region with this exact code, if any
pub fn find_by_code(table: &DataTable, code: &str) -> Option<RegionHit> {
    let mut found = None;
    let mut path = Vec::new();
    for region in &table.root {
        walk(region, &mut path, &mut |r, p| {
            if found.is_none() && r.code == code {
                found = Some(hit(r, p));
            }
        });
    }
    found
}

fn walk<F>(region: &RegionTable, path: &mut Vec<String>, f: &mut F)
where
    F: FnMut(&RegionTable, &[String]),
{
    path.push(region.name.clone());
    f(region, path);
    for child in &region.children {
        walk(child, path, f);
    }
    path.pop();
}

fn hit(region: &RegionTable, path: &[String]) -> RegionHit {
    RegionHit {
        path: path.to_vec(),
        code: region.code.clone(),
        name: region.name.clone(),
        level: region.level,
        center: region.center,
    }
}
