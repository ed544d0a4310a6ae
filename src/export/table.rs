//! Binary table layout and file I/O.

use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::models::{Center, RegionLevel, RegionNode};

/// File signature, "XZQH"
pub const TABLE_MAGIC: [u8; 4] = *b"XZQH";
pub const TABLE_VERSION: u32 = 1;

/// Fixed-size prefix of every table file: magic bytes, then a little-endian u32 version.
#[derive(Debug, Deserialize)]
struct TableHeader {
    magic: [u8; 4],
    version: u32,
}

impl TableHeader {
    fn check(&self) -> Result<(), ExportError> {
        if self.magic != TABLE_MAGIC {
            return Err(ExportError::BadMagic);
        }
        if self.version != TABLE_VERSION {
            return Err(ExportError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bincode error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("not a region table (bad magic)")]
    BadMagic,

    #[error("unsupported table version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown level tag {0} for region {1}")]
    UnknownLevel(u8, String),
}

/// Inline coordinate struct
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl From<Center> for Coordinate {
    fn from(c: Center) -> Self {
        Self {
            longitude: c.longitude,
            latitude: c.latitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionTable {
    pub code: String,
    pub name: String,
    /// See [`RegionLevel::to_table_code`]
    pub level: u8,
    pub center: Option<Coordinate>,
    pub children: Vec<RegionTable>,
}

impl RegionTable {
    /// Children first, then the node itself
    pub fn from_node(node: &RegionNode) -> Self {
        let children = node.children.iter().map(RegionTable::from_node).collect();
        Self {
            code: node.code.clone(),
            name: node.name.clone(),
            level: node.level.to_table_code(),
            center: node.center.map(Coordinate::from),
            children,
        }
    }

    pub fn level(&self) -> Option<RegionLevel> {
        RegionLevel::from_table_code(self.level)
    }

    pub fn to_node(&self) -> Result<RegionNode, ExportError> {
        let level = self
            .level()
            .ok_or_else(|| ExportError::UnknownLevel(self.level, self.code.clone()))?;
        let children = self
            .children
            .iter()
            .map(RegionTable::to_node)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RegionNode {
            code: self.code.clone(),
            name: self.name.clone(),
            level,
            center: self
                .center
                .and_then(|c| Center::new(c.longitude, c.latitude)),
            children,
        })
    }
}

/// Root table of the binary file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub magic: [u8; 4],
    pub version: u32,
    pub root: Vec<RegionTable>,
}

impl DataTable {
    pub fn from_roots(roots: &[RegionNode]) -> Self {
        Self {
            magic: TABLE_MAGIC,
            version: TABLE_VERSION,
            root: roots.iter().map(RegionTable::from_node).collect(),
        }
    }

    pub fn to_roots(&self) -> Result<Vec<RegionNode>, ExportError> {
        self.root.iter().map(RegionTable::to_node).collect()
    }

    pub fn encode(&self) -> Result<Vec<u8>, ExportError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a table from `reader`.
    ///
    /// The header is checked before anything else is read, and the body may
    /// not claim more than `limit` bytes, so a foreign or truncated file is
    /// reported as an error instead of being allocated for.
    pub fn read_from<R: Read>(mut reader: R, limit: u64) -> Result<Self, ExportError> {
        let header: TableHeader = bincode::deserialize_from(&mut reader)?;
        header.check()?;

        let root = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .with_limit(limit)
            .deserialize_from(reader)?;

        Ok(Self {
            magic: header.magic,
            version: header.version,
            root,
        })
    }
}

/// Encode `roots` into `path`, returning the number of bytes written.
///
/// The tree is expected to be normalized already; nothing is re-validated here.
pub fn write_table(path: &Path, roots: &[RegionNode]) -> Result<usize, ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let bytes = DataTable::from_roots(roots).encode()?;
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes).map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(bytes.len())
}

pub fn read_table(path: &Path) -> Result<DataTable, ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let len = file.metadata().map_err(io_err)?.len();
    DataTable::read_from(BufReader::new(file), len)
}
