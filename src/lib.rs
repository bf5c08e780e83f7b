//! Review Sentinel library
//!
//! Exposes the CLI, configuration and page fixtures for integration testing.

pub mod cli;
pub mod config;
pub mod fixture;

pub use config::{Config, ConfigError, LoggingConfig, PipelineConfig};
pub use fixture::{FixtureError, FixturePage, PageFixture};
