//! Run configuration, loaded from an optional TOML file.
//!
//! ```toml
//! [amap]
//! key = "..."
//! interval_ms = 40
//!
//! [files]
//! original = "xzqh_2023_tree.json"
//! checkpoint = "xzqh_with_amap_coordinates.json"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::amap::AMAP_DISTRICT_URL;

/// Environment variable consulted when no key is configured
pub const AMAP_KEY_ENV: &str = "AMAP_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub amap: AmapConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AmapConfig {
    pub key: Option<String>,
    pub base_url: String,
    /// Minimum gap between two requests; 40ms keeps us at 25 QPS
    pub interval_ms: u64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// `subdistrict` used for province queries; 2 reaches through municipal virtual layers
    pub province_depth: u8,
    pub prefecture_depth: u8,
}

impl Default for AmapConfig {
    fn default() -> Self {
        Self {
            key: None,
            base_url: AMAP_DISTRICT_URL.to_string(),
            interval_ms: 40,
            timeout_secs: 10,
            max_attempts: 2,
            province_depth: 2,
            prefecture_depth: 1,
        }
    }
}

impl AmapConfig {
    /// Configured key, falling back to `AMAP_API_KEY`
    pub fn resolve_key(&self) -> Option<String> {
        self.key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(AMAP_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilesConfig {
    /// Pristine hierarchy without centers
    pub original: PathBuf,
    /// Output of the previous run, also where this run writes
    pub checkpoint: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            original: PathBuf::from("xzqh_2023_tree.json"),
            checkpoint: PathBuf::from("xzqh_with_amap_coordinates.json"),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }
}
