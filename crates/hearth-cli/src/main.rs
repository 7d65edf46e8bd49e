//! The `hearth` binary: parse flags, resolve configuration, run one mode.

use clap::Parser;
use hearth_bundler::RolldownEngine;
use hearth_cli::config::{HearthConfig, Manifest};
use hearth_cli::{cli, commands, error, logger, ui};
use miette::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    ui::init_colors(args.no_color);

    run(args).await.map_err(error::cli_error_to_miette)
}

async fn run(args: cli::Cli) -> error::Result<()> {
    let cwd = std::env::current_dir()?;
    let manifest = Manifest::load(&cwd)?;
    let config = HearthConfig::load(&args, &cwd)?.into_orchestrator(&cwd, manifest)?;

    logger::init_tracing(config.log_level, args.no_color || !ui::should_use_color());
    let logger = logger::Logger::new(config.log_level);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, shutting down");
            on_interrupt.cancel();
        }
    });

    commands::execute(&config, Arc::new(RolldownEngine::new()), logger, cancel).await
}
