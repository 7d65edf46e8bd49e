//! Logging for the hearth CLI.
//!
//! Two layers:
//!
//! - [`init_tracing`] installs the `tracing` subscriber used for internal
//!   events (resolution decisions, rebuild timings, request handling).
//! - [`Logger`] is the operator-facing channel. It is a small `Copy` value
//!   built once from the configured [`LogLevel`] and handed to every
//!   component that reports to the terminal, so there is no process-wide
//!   level to mutate.
//!
//! ```rust,no_run
//! use hearth_cli::cli::LogLevel;
//! use hearth_cli::logger::{Logger, init_tracing};
//!
//! init_tracing(LogLevel::Info, false);
//! let logger = Logger::new(LogLevel::Info);
//! logger.info("Building public/index.html");
//! logger.banner("ready on", "http://localhost:1234");
//! ```

use crate::cli::LogLevel;
use crate::ui;
use owo_colors::{OwoColorize, Stream::Stderr};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directives for a level, scoped to hearth's own crates.
pub fn filter_directives(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Verbose => "hearth_cli=trace,hearth_bundler=trace",
        LogLevel::Debug => "hearth_cli=debug,hearth_bundler=debug",
        LogLevel::Info => "hearth_cli=info,hearth_bundler=info",
        LogLevel::Warning => "hearth_cli=warn,hearth_bundler=warn",
        LogLevel::Error => "hearth_cli=error,hearth_bundler=error",
        LogLevel::Silent => "off",
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over `level` when set. Call once, before anything logs.
pub fn init_tracing(level: LogLevel, no_color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Operator-facing logger with a fixed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Logger {
    level: LogLevel,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Warning)
    }
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// Logger that prints nothing.
    pub fn silent() -> Self {
        Self::new(LogLevel::Silent)
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Whether messages of `severity` are shown.
    pub fn enabled(&self, severity: LogLevel) -> bool {
        self.level != LogLevel::Silent && severity >= self.level
    }

    pub fn info(&self, message: &str) {
        if self.enabled(LogLevel::Info) {
            ui::info(message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled(LogLevel::Warning) {
            ui::warning(message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.enabled(LogLevel::Error) {
            ui::error(message);
        }
    }

    /// Completion messages; shown at every level except silent.
    pub fn success(&self, message: &str) {
        if self.level != LogLevel::Silent {
            ui::success(message);
        }
    }

    /// The "ready on <url>" line; shown at every level except silent.
    pub fn banner(&self, label: &str, value: &str) {
        if self.level != LogLevel::Silent {
            eprintln!(
                "{} {} {}",
                "hearth".if_supports_color(Stderr, |t| t.bold()),
                label,
                value.if_supports_color(Stderr, |t| t.blue())
            );
        }
    }
}
