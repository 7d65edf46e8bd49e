//! # hearth-bundler
//!
//! Engine side of hearth: the [`Engine`] contract, a Rolldown-backed
//! implementation, the resolution policy layered on top of the engine's
//! resolver, and the [`ArtifactBuilder`] the orchestrator drives.
//!
//! ```no_run
//! use hearth_bundler::{ArtifactBuilder, BuildOptions, RolldownEngine};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let options = Arc::new(BuildOptions::new("/project", "/project/dist"));
//! let builder = ArtifactBuilder::new(Arc::new(RolldownEngine::new()), options);
//!
//! let (artifacts, result) = builder.build(Path::new("/project/src/main.js")).await;
//! for diagnostic in &result.errors {
//!     eprintln!("{diagnostic}");
//! }
//! println!("{artifacts:?}");
//! # }
//! ```

pub mod artifact;
pub mod diagnostics;
pub mod engine;
pub mod options;
pub mod output;
pub mod plugins;
pub mod resolve;

pub use artifact::{ArtifactBuilder, normalize_artifacts};
pub use diagnostics::{Diagnostic, Location};
pub use engine::{BuildRequest, BuildResult, Engine, OutputFile, RolldownEngine};
pub use options::{BuildOptions, OutputFormat, Platform, SOURCE_EXTENSIONS, SourceMap};
pub use plugins::{DefinePlugin, ResolutionPolicyPlugin};
pub use resolve::{
    DirectoryIndexRule, Resolution, ResolutionPolicy, ResolveRule, RootedSourceRule,
};

// Plugin types used by the built-in plugins
pub use rolldown_plugin::{
    __inner::SharedPluginable, HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn,
    HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage, Plugin, PluginContext,
};

/// Error types for hearth-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error from Rolldown bundler.
    #[error("Rolldown bundler error: {}", format_bundler_error(.0))]
    Bundler(Vec<Diagnostic>),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),
}

/// Result type alias for hearth-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a bundler error from a Rolldown error.
    pub fn from_rolldown_batch(error: &dyn std::fmt::Debug) -> Self {
        Error::Bundler(diagnostics::extract_from_rolldown_error(error))
    }
}

fn format_bundler_error(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "Unknown bundler error".to_string(),
        [single] => single.to_string(),
        many => format!(
            "{} errors: {}",
            many.len(),
            many.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Bundler(_) => "BUNDLER_ERROR",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Io(_) => "IO_ERROR",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check your configuration file for syntax errors.\nError: {}",
                msg
            ))),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{}' is invalid. Bundle filenames must stay inside the output directory.",
                path
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {}",
                msg
            ))),
            Error::Bundler(diagnostics) if diagnostics.len() > 1 => Some(Box::new(
                "Multiple bundler errors occurred. See details below.".to_string(),
            )),
            _ => None,
        }
    }
}
