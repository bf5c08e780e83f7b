use clap::Subcommand;

use super::annotate::AnnotateArgs;
use super::check::CheckArgs;
use super::config::ConfigArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Build a page from a fixture, auto-score its reviews and print the badges
    Annotate(AnnotateArgs),

    /// Score a single review
    Check(CheckArgs),

    /// Send a sample review through the bridge to test the scoring service
    Ping,

    /// Inspect the resolved configuration
    Config(ConfigArgs),
}
