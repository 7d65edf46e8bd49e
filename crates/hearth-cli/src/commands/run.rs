//! Run mode: bundle a module, run it with node, restart it on every rebuild.

use hearth_bundler::ArtifactBuilder;
use tokio_util::sync::CancellationToken;

use crate::commands::ensure_entry;
use crate::config::OrchestratorConfig;
use crate::dev::watcher::{DEFAULT_DEBOUNCE, ignore_list};
use crate::dev::{FileWatcher, RebuildHandler, RebuildLoop};
use crate::error::{BuildError, Result};
use crate::logger::Logger;
use crate::supervisor::{Launcher, ProcessSupervisor};

/// Build once, start the first artifact, then rebuild and restart whenever
/// a module of the build changes.
///
/// The first artifact of the initial build is what gets launched on every
/// restart. If the initial build produces nothing there is nothing to run,
/// which is fatal.
pub async fn run_entry<L: Launcher>(
    config: &OrchestratorConfig,
    builder: &ArtifactBuilder,
    launcher: L,
    logger: Logger,
    cancel: CancellationToken,
) -> Result<()> {
    ensure_entry(&config.entry)?;

    let (artifacts, result) = builder.build(&config.entry).await;
    let Some(first) = artifacts.first() else {
        for diagnostic in &result.errors {
            logger.error(&diagnostic.to_string());
        }
        return Err(BuildError::NoArtifacts(config.entry.clone()).into());
    };

    let artifact = config.out_dir().join(first);
    logger.info(&format!("Running {}", artifact.display()));

    let mut supervisor = ProcessSupervisor::new(launcher, artifact, logger);
    supervisor.on_rebuild(&result).await?;

    let (watcher, changes) = FileWatcher::new(
        config.cwd().to_path_buf(),
        ignore_list(config.cwd(), config.out_dir()),
        DEFAULT_DEBOUNCE,
    )?;
    tracing::debug!(root = %watcher.root().display(), "watching");

    RebuildLoop::new(builder.clone(), vec![config.entry.clone()], logger)
        .seeded(&result)
        .run(changes, &mut supervisor, cancel)
        .await
}
