use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::init_logging;
use pagewire_cli::config::load_config;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_json)?;
    debug!("Starting pagewire v{}", env!("CARGO_PKG_VERSION"));

    let loaded = load_config(cli.config.as_deref()).await?;
    let ctx = CliContext::new(loaded, cli.output.clone());

    match dispatch(&cli, &ctx).await {
        Ok(()) => {
            debug!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
