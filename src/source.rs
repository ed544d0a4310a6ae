//! Choosing, loading and saving the working tree.
//!
//! Reconciliation never cares where its tree came from: a pristine
//! hierarchy and the checkpoint of an earlier run load into the same type.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::models::RegionNode;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no input found: neither {checkpoint} nor {original} exists")]
    NotFound { original: PathBuf, checkpoint: PathBuf },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid region tree in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the working tree is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSource {
    /// Pristine hierarchy, chosen by `--force` or because no checkpoint exists yet
    Original(PathBuf),
    /// Output of an earlier run
    Checkpoint(PathBuf),
}

impl TreeSource {
    pub fn path(&self) -> &Path {
        match self {
            TreeSource::Original(p) | TreeSource::Checkpoint(p) => p,
        }
    }

    pub fn is_resume(&self) -> bool {
        matches!(self, TreeSource::Checkpoint(_))
    }
}

/// Pick the input: `force` prefers the original, otherwise resume from the
/// checkpoint when present and fall back to the original.
pub fn select_source(force: bool, original: &Path, checkpoint: &Path) -> Result<TreeSource, SourceError> {
    if force && original.exists() {
        return Ok(TreeSource::Original(original.to_path_buf()));
    }
    if checkpoint.exists() {
        return Ok(TreeSource::Checkpoint(checkpoint.to_path_buf()));
    }
    if original.exists() {
        return Ok(TreeSource::Original(original.to_path_buf()));
    }
    Err(SourceError::NotFound {
        original: original.to_path_buf(),
        checkpoint: checkpoint.to_path_buf(),
    })
}

/// Read a JSON array of regions
pub fn load_tree(path: &Path) -> Result<Vec<RegionNode>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let roots: Vec<RegionNode> =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    info!("Loaded {} top-level regions from {}", roots.len(), path.display());
    Ok(roots)
}

/// Read any JSON document through serde (provider dumps and the like)
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| SourceError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `roots` as pretty JSON.
///
/// The data goes to a temporary file next to `path` first and replaces
/// `path` only once complete, so an interrupted save leaves the previous
/// checkpoint intact.
pub fn save_tree(path: &Path, roots: &[RegionNode]) -> Result<(), SourceError> {
    let io_err = |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;

    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, roots).map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(io_err)?;
    }

    tmp.persist(path).map_err(|e| io_err(e.error))?;
    info!("Saved {} top-level regions to {}", roots.len(), path.display());
    Ok(())
}
