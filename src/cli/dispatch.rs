use anyhow::Result;

use super::annotate::cmd_annotate;
use super::check::{cmd_check, cmd_ping};
use super::config::cmd_config;
use super::env::CliArgs;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Annotate(args) => cmd_annotate(args, ctx, cli.output).await,
        Commands::Check(args) => cmd_check(args, ctx, cli.output).await,
        Commands::Ping => cmd_ping(ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
