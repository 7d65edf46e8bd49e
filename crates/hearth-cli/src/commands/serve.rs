//! Serve mode: render the HTML entry, serve it, rebuild its modules on change.

use hearth_bundler::ArtifactBuilder;
use tokio_util::sync::CancellationToken;

use crate::config::OrchestratorConfig;
use crate::dev::watcher::{DEFAULT_DEBOUNCE, ignore_list};
use crate::dev::{DevServer, FileWatcher, LiveReload, RebuildLoop, RebuildNotifier};
use crate::error::Result;
use crate::html::render_index;
use crate::logger::Logger;

/// Render once, then run the HTTP server and the rebuild loop side by side
/// until `cancel` fires.
///
/// The document itself is rendered only once; rebuilds cover the modules it
/// named, and each batch of changes produces one reload or one round of
/// errors. Asset copies are left to finish in the background.
pub async fn serve_index(
    config: &OrchestratorConfig,
    builder: &ArtifactBuilder,
    logger: Logger,
    cancel: CancellationToken,
) -> Result<()> {
    let output = render_index(config, builder, logger).await?;
    output.copies.detach();
    logger.info(&format!(
        "Rendered {} ({} module(s) watched)",
        output.index_path.display(),
        output.references.len()
    ));

    let (_watcher, changes) = FileWatcher::new(
        config.cwd().to_path_buf(),
        ignore_list(config.cwd(), config.out_dir()),
        DEFAULT_DEBOUNCE,
    )?;

    let live = LiveReload::new();
    let server = DevServer::new(config, live.clone(), logger);
    let server_task = tokio::spawn(server.run(cancel.clone()));

    let mut notifier = RebuildNotifier::new(live, logger);
    let result = RebuildLoop::new(builder.clone(), output.references, logger)
        .seeded(&output.builds)
        .run(changes, &mut notifier, cancel.clone())
        .await;

    // The loop only ends on cancellation or error; either way the server goes too.
    cancel.cancel();
    if let Err(e) = server_task.await {
        tracing::warn!(error = %e, "server task ended abnormally");
    }

    result
}
