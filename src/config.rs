//! Configuration document for the `sentinel` binary.
//!
//! Every section is optional; missing keys fall back to the pipeline's
//! reference values.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use extensions_bridge::BridgeConfig;
use sentinel_annotator::{AutoScoringOptions, GateOptions};
use sentinel_page_dom::RootMargin;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scoring: BridgeConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_concurrent: usize,
    pub debounce_ms: u64,
    /// Vertical growth of the viewport used for prefetching.
    pub root_margin_px: f64,
    pub threshold: f64,
    pub check_buttons: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            debounce_ms: 250,
            root_margin_px: 200.0,
            threshold: 0.1,
            check_buttons: false,
        }
    }
}

impl PipelineConfig {
    pub fn options(&self) -> AutoScoringOptions {
        AutoScoringOptions {
            max_concurrent: self.max_concurrent,
            debounce: Duration::from_millis(self.debounce_ms),
            gate: GateOptions {
                root_margin: RootMargin::vertical(self.root_margin_px),
                threshold: self.threshold,
            },
            check_buttons: self.check_buttons,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("scoring.endpoint is not an http(s) URL: {0}")]
    Endpoint(String),
    #[error("scoring.timeout_ms must be greater than zero")]
    Timeout,
    #[error("pipeline.max_concurrent must be at least 1")]
    Concurrency,
    #[error("pipeline.threshold must lie in [0, 1], got {0}")]
    Threshold(f64),
    #[error("pipeline.root_margin_px must not be negative, got {0}")]
    RootMargin(f64),
    #[error("logging.level `{0}` is not a tracing level")]
    Level(String),
}

impl Config {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = &self.scoring.endpoint;
        match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::Endpoint(endpoint.clone())),
        }
        if self.scoring.timeout_ms == 0 {
            return Err(ConfigError::Timeout);
        }
        if self.pipeline.max_concurrent == 0 {
            return Err(ConfigError::Concurrency);
        }
        let threshold = self.pipeline.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Threshold(threshold));
        }
        let margin = self.pipeline.root_margin_px;
        if !margin.is_finite() || margin < 0.0 {
            return Err(ConfigError::RootMargin(margin));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Level(self.logging.level.clone()));
        }
        Ok(())
    }
}
