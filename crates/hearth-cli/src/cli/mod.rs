//! Command-line interface definition for hearth.
//!
//! There are no subcommands: the entry's extension and `--serve` together
//! pick one of four modes.
//!
//! - `hearth src/server.js` - bundle once
//! - `hearth src/server.js --serve` - bundle, run with node, restart on change
//! - `hearth public/index.html` - render the page and bundle what it names
//! - `hearth public/index.html --serve` - same, served with live reload

pub mod enums;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use enums::*;
pub use validation::parse_define;

/// hearth - a zero-config dev orchestrator
#[derive(Parser, Debug, Default)]
#[command(
    name = "hearth",
    version,
    about = "A zero-config dev orchestrator",
    long_about = "hearth bundles a module or an HTML page and keeps it current.\n\
                  With --serve, HTML entries are served with live reload and other\n\
                  entries are run under node and restarted on every rebuild."
)]
pub struct Cli {
    /// Entry module or HTML document [default: public/index.html]
    #[arg(value_name = "ENTRY")]
    pub entry: Option<PathBuf>,

    /// Watch and serve (HTML) or run (modules) the entry
    #[arg(long)]
    pub serve: bool,

    /// Serve over HTTPS, generating a self-signed key pair if needed
    #[arg(long)]
    pub secure: bool,

    /// Host to bind the dev server to [default: localhost]
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind the dev server to [default: 1234]
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Output directory [default: dist]
    #[arg(long, value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    /// Output format for the bundle
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    /// Target platform
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// Leave a package out of the bundle (repeatable)
    #[arg(long, value_name = "PKG")]
    pub external: Vec<String>,

    /// Replace an identifier with a value (repeatable)
    ///
    /// Example: --define DEBUG=false
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_define)]
    pub define: Vec<(String, String)>,

    /// Source map generation mode
    #[arg(long, value_enum)]
    pub sourcemap: Option<SourceMapMode>,

    /// Minify output
    #[arg(long)]
    pub minify: bool,

    /// Operator output verbosity [default: warning]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Path to a config file [default: hearth.config.json]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Level implied by `--log-level`, `-v` and `-q`, if any was given.
    ///
    /// An explicit `--log-level` wins over the shorthand flags.
    pub fn requested_log_level(&self) -> Option<LogLevel> {
        if self.log_level.is_some() {
            return self.log_level;
        }
        if self.verbose {
            return Some(LogLevel::Debug);
        }
        if self.quiet {
            return Some(LogLevel::Error);
        }
        None
    }
}
