//! District documents returned by the Amap district API.
//!
//! The provider's nesting does not mirror [`RegionNode`](super::RegionNode):
//! municipalities come back with a virtual "城区" layer between the province
//! and its districts, and some provinces return county-level cities directly.

use serde::{Deserialize, Deserializer};

use super::Center;

/// Envelope of a `/v3/config/district` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistrictResponse {
    /// "1" on success
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub info: String,

    /// "10000" on success
    #[serde(default)]
    pub infocode: String,

    #[serde(default)]
    pub districts: Vec<ProviderDistrict>,
}

impl DistrictResponse {
    pub fn is_success(&self) -> bool {
        self.status == "1" && self.infocode == "10000"
    }
}

/// One district in the provider tree.
///
/// Amap encodes missing scalars as `[]`, so every scalar goes through a
/// lenient deserializer that maps non-strings to `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderDistrict {
    #[serde(default, deserialize_with = "lenient_string")]
    pub adcode: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,

    /// Coordinate string, `"lon,lat"`
    #[serde(default, deserialize_with = "lenient_string")]
    pub center: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub level: Option<String>,

    #[serde(default)]
    pub districts: Vec<ProviderDistrict>,
}

impl ProviderDistrict {
    pub fn new(adcode: &str, name: &str, center: &str) -> Self {
        Self {
            adcode: Some(adcode.to_string()),
            name: Some(name.to_string()),
            center: Some(center.to_string()),
            level: None,
            districts: Vec::new(),
        }
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = Some(level.to_string());
        self
    }

    pub fn with_districts(mut self, districts: Vec<ProviderDistrict>) -> Self {
        self.districts = districts;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn adcode(&self) -> Option<&str> {
        self.adcode.as_deref().filter(|c| !c.is_empty())
    }

    /// Parsed center, `None` when absent or malformed
    pub fn parsed_center(&self) -> Option<Center> {
        self.center.as_deref().and_then(Center::parse)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
