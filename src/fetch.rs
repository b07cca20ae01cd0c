use serde::Deserialize;
use tracing::{debug, info};

use crate::catalog::{normalize_name, CatalogEntry};
use crate::CompareError;

/// Directory listing page as served by the API:
/// `{ "count": N, "results": [{"name": ..., "url": ...}] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryPage {
    pub count: u64,
    pub results: Vec<NamedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

/// Per-entity stat payload:
/// `{ "stats": [{"base_stat": N, "stat": {"name": ...}}] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsPayload {
    pub stats: Vec<StatEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatEntry {
    pub base_stat: f64,
    pub stat: StatName,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatName {
    pub name: String,
}

impl StatsPayload {
    /// Map the wire shape to attribute pairs, one per capitalized stat name,
    /// keeping the order the source listed them in.
    pub fn into_attributes(self) -> Vec<(String, f64)> {
        self.stats
            .into_iter()
            .map(|entry| (normalize_name(&entry.stat.name), entry.base_stat))
            .collect()
    }
}

/// The one seam the cache depends on: locator in, attribute pairs out.
/// Retry and timeout policy belongs to implementations, not callers.
pub trait FetchStats {
    fn fetch(&self, locator: &str) -> Result<Vec<(String, f64)>, CompareError>;
}

/// Blocking HTTP implementation over the public stats API.
pub struct HttpFetcher {
    base_url: String,
}

impl HttpFetcher {
    pub const DEFAULT_BASE_URL: &'static str = "https://pokeapi.co/api/v2/pokemon";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Fetch the full directory listing: probe the count first, then request
    /// one page sized to hold everything.
    pub fn fetch_directory(&self) -> Result<Vec<CatalogEntry>, CompareError> {
        let probe: DirectoryPage = self.get_json(&self.base_url)?;
        let url = format!("{}?offset=0&limit={}", self.base_url, probe.count);
        let full: DirectoryPage = self.get_json(&url)?;
        info!(count = full.results.len(), "fetched catalog listing");
        Ok(full
            .results
            .into_iter()
            .map(|r| CatalogEntry {
                name: r.name,
                locator: r.url,
            })
            .collect())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, CompareError> {
        debug!(url, "GET");
        ureq::get(url)
            .call()
            .map_err(|e| fetch_failed(url, &e))?
            .into_json()
            .map_err(|e| fetch_failed(url, &e))
    }
}

impl FetchStats for HttpFetcher {
    fn fetch(&self, locator: &str) -> Result<Vec<(String, f64)>, CompareError> {
        let payload: StatsPayload = self.get_json(locator)?;
        Ok(payload.into_attributes())
    }
}

fn fetch_failed(locator: &str, reason: &dyn std::fmt::Display) -> CompareError {
    CompareError::FetchFailed {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}
