use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Prints `value` for the structured formats. Returns false for
    /// [`OutputFormat::Human`], which each command renders itself.
    pub fn emit<T: Serialize>(self, value: &T) -> Result<bool> {
        match self {
            OutputFormat::Human => return Ok(false),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        }
        Ok(true)
    }
}
