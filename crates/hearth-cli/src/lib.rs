//! hearth - a zero-config dev orchestrator.
//!
//! Given one entry file, hearth picks one of four modes:
//!
//! | entry         | `--serve` | mode                                        |
//! |---------------|-----------|---------------------------------------------|
//! | module        | no        | bundle once                                 |
//! | module        | yes       | bundle, run under node, restart on change   |
//! | `.html`       | no        | render the document once                    |
//! | `.html`       | yes       | render, serve, live-reload on change        |
//!
//! # Architecture
//!
//! - [`cli`] - command-line flags
//! - [`config`] - layered configuration and `package.json` handling
//! - [`commands`] - the four modes
//! - [`html`] - rendering HTML entries through template functions
//! - [`dev`] - file watching, the rebuild loop, the HTTP server, live reload
//! - [`supervisor`] - restarting the Node child process
//! - [`error`] - error types with actionable hints
//! - [`logger`] and [`ui`] - terminal output
//!
//! # Example
//!
//! ```rust,no_run
//! use hearth_bundler::RolldownEngine;
//! use hearth_cli::{cli::Cli, commands, config::HearthConfig, logger::Logger};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> hearth_cli::Result<()> {
//! let cwd = std::env::current_dir()?;
//! let config = HearthConfig::load(&Cli::default(), &cwd)?.into_orchestrator(&cwd, None)?;
//! let logger = Logger::new(config.log_level);
//! commands::execute(&config, Arc::new(RolldownEngine::new()), logger, CancellationToken::new()).await
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod html;
pub mod logger;
pub mod supervisor;
pub mod ui;

pub use error::{BuildError, CliError, ConfigError, Result, ResultExt, SupervisorError};
