use super::config::cmd_config;
use super::env::CliArgs;
use super::info::cmd_info;
use super::presets::cmd_presets;
use super::replay::cmd_replay;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Replay(args) => cmd_replay(args, ctx).await,
        Commands::Presets => cmd_presets(ctx),
        Commands::Config(args) => cmd_config(args, ctx).await,
        Commands::Info => cmd_info(ctx),
    }
}
