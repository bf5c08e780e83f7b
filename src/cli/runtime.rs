use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

pub const LOCAL_CONFIG: &str = "config/sentinel.yaml";

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    /// False when `path` did not exist and defaults were used.
    pub from_file: bool,
}

/// `--config`, then `./config/sentinel.yaml`, then the user config dir.
pub fn config_candidates(explicit: Option<&PathBuf>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.clone()];
    }
    let mut candidates = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(mut path) = dirs::config_dir() {
        path.push("review-sentinel");
        path.push("config.yaml");
        candidates.push(path);
    }
    candidates
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let candidates = config_candidates(config_path);
    for path in &candidates {
        if !fs::try_exists(path).await.unwrap_or(false) {
            continue;
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Config::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        return Ok(LoadedConfig {
            config,
            path: path.clone(),
            from_file: true,
        });
    }

    if let Some(path) = config_path {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    Ok(LoadedConfig {
        config: Config::default(),
        path: PathBuf::from(LOCAL_CONFIG),
        from_file: false,
    })
}
