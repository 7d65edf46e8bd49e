//! The four run modes.
//!
//! The entry's extension and `--serve` pick exactly one:
//!
//! - [`build::build_entry`] - bundle a module once
//! - [`run::run_entry`] - bundle, run under node, restart on change
//! - [`build::build_index`] - render an HTML entry once
//! - [`serve::serve_index`] - render and serve an HTML entry with live reload

pub mod build;
pub mod run;
pub mod serve;

use hearth_bundler::{ArtifactBuilder, Engine};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{Mode, OrchestratorConfig};
use crate::error::{BuildError, Result};
use crate::logger::Logger;
use crate::supervisor::NodeLauncher;

/// Run the mode `config` selects until it finishes or `cancel` fires.
pub async fn execute(
    config: &OrchestratorConfig,
    engine: Arc<dyn Engine>,
    logger: Logger,
    cancel: CancellationToken,
) -> Result<()> {
    create_out_dir(config.out_dir())?;
    let builder = ArtifactBuilder::new(engine, Arc::clone(&config.build));

    let mode = config.mode();
    tracing::debug!(?mode, entry = %config.entry.display(), "starting");

    match mode {
        Mode::BuildEntry => build::build_entry(config, &builder, logger).await.map(drop),
        Mode::RunEntry => {
            run::run_entry(config, &builder, NodeLauncher::default(), logger, cancel).await
        }
        Mode::BuildIndex => build::build_index(config, &builder, logger).await.map(drop),
        Mode::ServeIndex => serve::serve_index(config, &builder, logger, cancel).await,
    }
}

/// Create the output directory (mode 0775 on unix).
pub fn create_out_dir(path: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o775);
    }

    builder
        .create(path)
        .map_err(|_| BuildError::OutputNotWritable(path.to_path_buf()).into())
}

/// Fail with [`BuildError::EntryNotFound`] unless `entry` is a file.
pub(crate) fn ensure_entry(entry: &Path) -> Result<()> {
    if entry.is_file() {
        Ok(())
    } else {
        Err(BuildError::EntryNotFound(entry.to_path_buf()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_out_dir_nested() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("a/b/dist");
        create_out_dir(&out).unwrap();
        assert!(out.is_dir());
        // Existing directory is fine.
        create_out_dir(&out).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_create_out_dir_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let out = temp.path().join("dist");
        create_out_dir(&out).unwrap();

        let mode = std::fs::metadata(&out).unwrap().permissions().mode() & 0o777;
        // The process umask may clear bits but never adds any.
        assert_eq!(mode & !0o775, 0);
    }

    #[test]
    fn test_ensure_entry() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("app.js"), "").unwrap();

        assert!(ensure_entry(&temp.path().join("app.js")).is_ok());
        assert!(ensure_entry(&temp.path().join("missing.js")).is_err());
        assert!(ensure_entry(temp.path()).is_err());
    }
}
