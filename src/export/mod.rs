//! Compact binary table of the finished hierarchy.
//!
//! The table mirrors the region tree (code, name, level tag, inline
//! coordinate, nested children) and is encoded with bincode behind a small
//! magic/version header.

mod search;
mod table;

pub use search::{find_by_code, find_by_name, RegionHit};
pub use table::{
    read_table, write_table, Coordinate, DataTable, ExportError, RegionTable, TABLE_MAGIC,
    TABLE_VERSION,
};
