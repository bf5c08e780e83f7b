//! Scoring endpoint and bridge configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5051/predict";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Scoring service URL accepting `{"reviews": [...]}`.
    pub endpoint: String,
    /// Per-request HTTP timeout.
    pub timeout_ms: u64,
    /// Messages buffered between the page and the background context.
    pub channel_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: 10_000,
            channel_capacity: 64,
        }
    }
}
