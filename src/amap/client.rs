//! HTTP client for `/v3/config/district`.

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::Throttle;
use crate::config::AmapConfig;
use crate::models::{DistrictResponse, ProviderDistrict};

pub const AMAP_DISTRICT_URL: &str = "https://restapi.amap.com/v3/config/district";

/// Why a district query produced no data
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http status {0}")]
    Status(u16),

    #[error("provider rejected query: {info} ({infocode})")]
    Provider { info: String, infocode: String },
}

/// Source of administrative divisions.
///
/// `depth` is the number of descendant levels to include (Amap `subdistrict`, 0-3).
#[allow(async_fn_in_trait)]
pub trait DistrictProvider {
    async fn query_division(
        &mut self,
        keywords: &str,
        depth: u8,
    ) -> Result<Vec<ProviderDistrict>, QueryError>;
}

/// Amap district client with pacing and a bounded retry.
pub struct AmapClient {
    client: Client,
    base_url: String,
    key: String,
    throttle: Throttle,
    max_attempts: u32,
    request_count: usize,
}

impl AmapClient {
    pub fn new(key: &str, config: &AmapConfig) -> Result<Self, QueryError> {
        let client = Client::builder()
            .user_agent(concat!("xzqh/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            key: key.to_string(),
            throttle: Throttle::new(Duration::from_millis(config.interval_ms)),
            max_attempts: config.max_attempts.max(1),
            request_count: 0,
        })
    }

    /// Minimum gap kept between two requests
    pub fn interval(&self) -> Duration {
        self.throttle.interval()
    }

    /// Requests sent so far, retries included
    pub fn request_count(&self) -> usize {
        self.request_count
    }

    fn request_url(&self, keywords: &str, depth: u8) -> Result<Url, QueryError> {
        let depth = depth.to_string();
        Ok(Url::parse_with_params(
            &self.base_url,
            &[
                ("keywords", keywords),
                ("subdistrict", depth.as_str()),
                ("key", self.key.as_str()),
                ("output", "JSON"),
            ],
        )?)
    }

    async fn fetch(&mut self, url: Url) -> Result<Vec<ProviderDistrict>, QueryError> {
        // Every attempt, retries included, goes through the throttle
        self.throttle.wait().await;
        self.request_count += 1;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(QueryError::Status(response.status().as_u16()));
        }

        let body: DistrictResponse = response.json().await?;
        if !body.is_success() {
            return Err(QueryError::Provider {
                info: body.info,
                infocode: body.infocode,
            });
        }

        Ok(body.districts)
    }
}

impl DistrictProvider for AmapClient {
    async fn query_division(
        &mut self,
        keywords: &str,
        depth: u8,
    ) -> Result<Vec<ProviderDistrict>, QueryError> {
        let url = self.request_url(keywords, depth)?;

        let mut attempts = 0;
        loop {
            attempts += 1;

            match self.fetch(url.clone()).await {
                Ok(districts) => {
                    debug!(
                        "Query '{}' (depth {}) returned {} districts",
                        keywords,
                        depth,
                        districts.len()
                    );
                    return Ok(districts);
                }
                // A rejected key or quota will not get better on retry
                Err(e @ QueryError::Provider { .. }) => return Err(e),
                Err(e) if attempts < self.max_attempts => {
                    warn!(
                        "District query '{}' failed (attempt {}/{}): {}",
                        keywords, attempts, self.max_attempts, e
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
