use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use extensions_bridge::{
    bridge_event_bus, BackgroundHandle, BackgroundService, BridgeScoringClient,
    HttpPredictionBackend, ScoringClient,
};

use crate::config::Config;

const EVENT_BUFFER: usize = 256;

pub struct CliContext {
    config: Arc<Config>,
    config_path: PathBuf,
}

/// A running background context and the page-side client talking to it.
pub struct ScoringStack {
    pub client: Arc<dyn ScoringClient>,
    pub background: BackgroundHandle,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
        }
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Starts the background prediction service against the configured
    /// endpoint. Must be called inside the runtime.
    pub fn scoring_stack(&self) -> Result<ScoringStack> {
        let scoring = &self.config.scoring;
        let backend = HttpPredictionBackend::new(scoring).context("Failed to build HTTP client")?;
        let (events, _) = bridge_event_bus(EVENT_BUFFER);
        let (bridge, background) = BackgroundService::new(Arc::new(backend), events)
            .spawn(scoring.channel_capacity);
        Ok(ScoringStack {
            client: Arc::new(BridgeScoringClient::new(Arc::new(bridge))),
            background,
        })
    }
}
