// Library exports for dexgraph

pub mod catalog;
pub mod fetch;
pub mod palette;
pub mod project;
pub mod render;
pub mod session;
pub mod table;

use serde::Deserialize;
use thiserror::Error;

/// Failure taxonomy for catalog resolution and stat fetching.
#[derive(Debug, Error)]
pub enum CompareError {
    /// The requested name was never listed by the catalog (e.g. a stale
    /// selection).
    #[error("unknown entity '{name}'")]
    UnknownEntity { name: String },

    /// The stat source failed at the transport or parse level.
    #[error("fetch failed for {locator}: {reason}")]
    FetchFailed { locator: String, reason: String },

    /// Surfaced by the cache when a requested name cannot be materialized.
    /// Rows committed before the failure stay in the table.
    #[error("entity '{name}' unavailable")]
    EntityUnavailable {
        name: String,
        #[source]
        source: Box<CompareError>,
    },
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
    #[serde(default)]
    pub title: Option<String>,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: OutputFormat::Png,
            title: None,
        }
    }
}
