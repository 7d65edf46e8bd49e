//! Error types for the hearth CLI.
//!
//! `CliError` is the top-level type every command returns. Domain errors
//! (`ConfigError`, `BuildError`, `SupervisorError`) carry the detail and a
//! `Hint:` line telling the operator what to do next, and convert into
//! `CliError` through `#[from]`.
//!
//! Build diagnostics reported by the engine are *not* errors at this level:
//! they travel inside `BuildResult` and are logged or broadcast. Only
//! failures that stop the orchestrator end up here.
//!
//! ```rust,no_run
//! use hearth_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_manifest(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_path(path)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (bad config file, invalid flag values, unreadable manifest)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fatal build orchestration errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// The supervised Node process could not be signalled or started
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Certificate generation or TLS configuration errors
    #[error("TLS error: {0}\n\nHint: Delete key.pem and cert.pem to have them regenerated")]
    Tls(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// HTML template parse or render errors
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file given with --config doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a hearth.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// package.json exists but can't be parsed
    #[error("Invalid package.json at {}: {error}\n\nHint: Fix the JSON syntax or remove the file", .path.display())]
    InvalidManifest {
        /// Location of the manifest
        path: PathBuf,
        /// Parser message
        error: String,
    },

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal build orchestration errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Entry document or module doesn't exist
    #[error("Entry point not found: {}\n\nHint: Pass the entry as the first argument (default: public/index.html)", .0.display())]
    EntryNotFound(PathBuf),

    /// The initial build of a supervised entry produced nothing to run
    #[error("Build of {} produced no runnable artifact\n\nHint: Fix the build errors above and restart", .0.display())]
    NoArtifacts(PathBuf),

    /// Output directory or index.html can't be written
    #[error("Output is not writable: {}\n\nHint: Check directory permissions or specify a different --outdir", .0.display())]
    OutputNotWritable(PathBuf),
}

/// Process supervision failures. Always fatal.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The running child couldn't be interrupted
    #[error("Failed to stop {}: {source}", .artifact.display())]
    Signal {
        artifact: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A new child couldn't be started
    #[error("Failed to start {}: {source}\n\nHint: Make sure `node` is installed and on PATH", .artifact.display())]
    Spawn {
        artifact: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }
}

mod miette;
pub use self::miette::cli_error_to_miette;
