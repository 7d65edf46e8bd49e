//! The watch-mode rebuild loop.
//!
//! File changes are collected for a short window. If any of them touches
//! the module graph of the last build, every watched entry is rebuilt in
//! order and the handler hears about the combined result once. Builds never
//! overlap, so an entry is never built twice at once.

use async_trait::async_trait;
use hearth_bundler::{ArtifactBuilder, BuildResult, SOURCE_EXTENSIONS};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dev::FileChange;
use crate::error::Result;
use crate::logger::Logger;
use crate::ui::format_duration;

/// How long changes are gathered before a rebuild starts.
pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(50);

/// Reacts to finished rebuilds.
#[async_trait]
pub trait RebuildHandler: Send {
    /// Called once per batch, after every entry is rebuilt and written, with
    /// the results of all entries merged. An error ends the loop.
    async fn on_rebuild(&mut self, result: &BuildResult) -> Result<()>;

    /// Called once when the loop is cancelled.
    async fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Rebuilds a fixed set of entries whenever their sources change.
///
/// Changes outside the module graph of the last build are ignored, so a
/// supervised program writing logs or data into the project doesn't restart
/// itself. While the last build has errors, any change to a source file
/// (by extension) also counts, since the missing module isn't in the graph.
#[derive(Debug, Clone)]
pub struct RebuildLoop {
    builder: ArtifactBuilder,
    entries: Vec<PathBuf>,
    batch_window: Duration,
    logger: Logger,
    watched: HashSet<PathBuf>,
    broken: bool,
}

impl RebuildLoop {
    /// Loop over `entries`, deduplicated in first-seen order.
    pub fn new(builder: ArtifactBuilder, entries: Vec<PathBuf>, logger: Logger) -> Self {
        let mut unique = Vec::with_capacity(entries.len());
        for entry in entries {
            if !unique.contains(&entry) {
                unique.push(entry);
            }
        }

        let watched = unique.iter().cloned().collect();
        Self {
            builder,
            entries: unique,
            batch_window: DEFAULT_BATCH_WINDOW,
            logger,
            watched,
            broken: false,
        }
    }

    /// Take the watch set from a build that already happened, typically the
    /// initial one.
    pub fn seeded(mut self, result: &BuildResult) -> Self {
        self.track(result);
        self
    }

    /// Run until `cancel` fires.
    ///
    /// A closed change channel doesn't end the loop; it just waits for
    /// cancellation.
    pub async fn run<H: RebuildHandler>(
        &mut self,
        mut changes: mpsc::Receiver<FileChange>,
        handler: &mut H,
        cancel: CancellationToken,
    ) -> Result<()> {
        loop {
            let first = tokio::select! {
                _ = cancel.cancelled() => break,
                change = changes.recv() => change,
            };
            let Some(first) = first else {
                cancel.cancelled().await;
                break;
            };

            let batch = self.collect_batch(first, &mut changes).await;
            let Some(trigger) = batch.iter().find(|change| self.is_relevant(change.path())) else {
                tracing::debug!(changes = batch.len(), "changes outside the module graph");
                continue;
            };

            tracing::debug!(changes = batch.len(), "rebuilding");
            self.logger
                .info(&format!("{} changed, rebuilding", trigger.path().display()));

            self.rebuild_all(handler).await?;
        }

        handler.on_shutdown().await
    }

    /// Rebuild every entry once, in order, then tell the handler once.
    pub async fn rebuild_all<H: RebuildHandler>(&mut self, handler: &mut H) -> Result<()> {
        let mut combined = BuildResult::default();
        for entry in &self.entries {
            let start = Instant::now();
            let (artifacts, result) = self.builder.build(entry).await;
            tracing::debug!(
                entry = %entry.display(),
                artifacts = artifacts.len(),
                errors = result.errors.len(),
                "rebuilt in {}",
                format_duration(start.elapsed())
            );
            combined.merge(result);
        }

        self.track(&combined);
        handler.on_rebuild(&combined).await
    }

    /// Whether a change to `path` calls for a rebuild.
    pub fn is_relevant(&self, path: &Path) -> bool {
        if self.watched.contains(path) {
            return true;
        }
        // Module ids come from the resolver, which follows symlinks.
        if std::fs::canonicalize(path).is_ok_and(|real| self.watched.contains(&real)) {
            return true;
        }
        self.broken
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
    }

    fn track(&mut self, result: &BuildResult) {
        let mut watched = HashSet::new();
        for path in self.entries.iter().chain(&result.watch_files) {
            if let Ok(real) = std::fs::canonicalize(path) {
                watched.insert(real);
            }
            watched.insert(path.clone());
        }
        self.watched = watched;
        self.broken = result.has_errors();
    }

    async fn collect_batch(
        &self,
        first: FileChange,
        changes: &mut mpsc::Receiver<FileChange>,
    ) -> Vec<FileChange> {
        let mut batch = vec![first];
        let window = tokio::time::sleep(self.batch_window);
        tokio::pin!(window);

        loop {
            tokio::select! {
                _ = &mut window => break,
                change = changes.recv() => match change {
                    Some(change) => batch.push(change),
                    None => break,
                },
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_bundler::{BuildOptions, BuildRequest, Diagnostic, Engine, OutputFile};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Reports `<entry>` and `/project/shared.js` as its module graph.
    #[derive(Default)]
    struct CountingEngine {
        built: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    #[async_trait]
    impl Engine for CountingEngine {
        async fn build(&self, request: BuildRequest) -> BuildResult {
            self.built.lock().push(request.entry.clone());
            let graph = [request.entry.clone(), PathBuf::from("/project/shared.js")];
            if self.fail {
                return BuildResult::failed(vec![Diagnostic::new("Could not resolve './gone'")])
                    .with_watch_files(graph);
            }
            let out = request.options.out_dir.join("app.js");
            BuildResult::success(vec![OutputFile::new(out)]).with_watch_files(graph)
        }
    }

    #[derive(Default)]
    struct Recording {
        results: Vec<BuildResult>,
        shutdowns: usize,
    }

    #[async_trait]
    impl RebuildHandler for Recording {
        async fn on_rebuild(&mut self, result: &BuildResult) -> Result<()> {
            self.results.push(result.clone());
            Ok(())
        }

        async fn on_shutdown(&mut self) -> Result<()> {
            self.shutdowns += 1;
            Ok(())
        }
    }

    fn rebuild_loop(engine: Arc<CountingEngine>, entries: Vec<PathBuf>) -> RebuildLoop {
        let options = Arc::new(BuildOptions::new("/project", "/project/dist"));
        let builder = ArtifactBuilder::new(engine, options);
        RebuildLoop::new(builder, entries, Logger::silent())
    }

    /// Feed `changes`, let the batch window pass, then cancel.
    async fn drive(mut rebuild: RebuildLoop, changes: &[FileChange]) -> Recording {
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        for change in changes {
            tx.send(change.clone()).await.unwrap();
        }

        let stop = cancel.clone();
        let run = tokio::spawn(async move {
            let mut handler = Recording::default();
            rebuild.run(rx, &mut handler, stop).await.unwrap();
            handler
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        let handler = run.await.unwrap();
        drop(tx);
        handler
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_changes_into_one_notification() {
        let engine = Arc::new(CountingEngine::default());
        let rebuild = rebuild_loop(
            Arc::clone(&engine),
            vec![PathBuf::from("/project/a.js"), PathBuf::from("/project/b.js")],
        );

        let handler = drive(
            rebuild,
            &[
                FileChange::Modified(PathBuf::from("/project/a.js")),
                FileChange::Modified(PathBuf::from("/project/b.js")),
                FileChange::Modified(PathBuf::from("/project/c.js")),
            ],
        )
        .await;

        // One batch: both entries rebuilt once, in order, one notification.
        assert_eq!(
            *engine.built.lock(),
            vec![PathBuf::from("/project/a.js"), PathBuf::from("/project/b.js")]
        );
        assert_eq!(handler.results.len(), 1);
        assert_eq!(handler.results[0].output_files.len(), 2);
        assert_eq!(handler.shutdowns, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_entries_build_once() {
        let engine = Arc::new(CountingEngine::default());
        let rebuild = rebuild_loop(
            Arc::clone(&engine),
            vec![PathBuf::from("/project/a.js"), PathBuf::from("/project/a.js")],
        );

        let handler = drive(rebuild, &[FileChange::Modified(PathBuf::from("/project/a.js"))]).await;

        assert_eq!(*engine.built.lock(), vec![PathBuf::from("/project/a.js")]);
        assert_eq!(handler.results.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_outside_graph_are_ignored() {
        let engine = Arc::new(CountingEngine::default());
        let rebuild = rebuild_loop(Arc::clone(&engine), vec![PathBuf::from("/project/a.js")]);

        let handler = drive(
            rebuild,
            &[
                FileChange::Created(PathBuf::from("/project/app.log")),
                FileChange::Modified(PathBuf::from("/project/data.sqlite")),
                FileChange::Modified(PathBuf::from("/project/unrelated.js")),
            ],
        )
        .await;

        assert!(engine.built.lock().is_empty());
        assert!(handler.results.is_empty());
        assert_eq!(handler.shutdowns, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_graph_triggers_rebuild() {
        let engine = Arc::new(CountingEngine::default());
        let seed = BuildResult::default().with_watch_files([PathBuf::from("/project/lib.js")]);
        let rebuild = rebuild_loop(Arc::clone(&engine), vec![PathBuf::from("/project/a.js")])
            .seeded(&seed);

        let handler = drive(rebuild, &[FileChange::Modified(PathBuf::from("/project/lib.js"))]).await;

        assert_eq!(engine.built.lock().len(), 1);
        assert_eq!(handler.results.len(), 1);
    }

    #[test]
    fn test_relevance_follows_last_build() {
        let engine = Arc::new(CountingEngine::default());
        let clean = BuildResult::default().with_watch_files([
            PathBuf::from("/project/lib.js"),
            PathBuf::from("/project/notes.txt"),
        ]);
        let rebuild = rebuild_loop(engine, vec![PathBuf::from("/project/a.js")]).seeded(&clean);

        assert!(rebuild.is_relevant(Path::new("/project/a.js")));
        assert!(rebuild.is_relevant(Path::new("/project/lib.js")));
        assert!(rebuild.is_relevant(Path::new("/project/notes.txt")));
        assert!(!rebuild.is_relevant(Path::new("/project/new.js")));

        let broken = BuildResult::failed(vec![Diagnostic::new("Could not resolve './new'")]);
        let rebuild = rebuild.seeded(&broken);
        assert!(rebuild.is_relevant(Path::new("/project/new.js")));
        assert!(!rebuild.is_relevant(Path::new("/project/app.log")));
        // The old graph is replaced, not extended.
        assert!(!rebuild.is_relevant(Path::new("/project/notes.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn test_relevance_sees_through_symlinks() {
        let temp = tempfile::TempDir::new().unwrap();
        let real = temp.path().join("real");
        std::fs::create_dir_all(&real).unwrap();
        std::fs::write(real.join("lib.js"), "export {};").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        // The watcher reports paths under `link`, the resolver under `real`.
        let seed = BuildResult::default()
            .with_watch_files([std::fs::canonicalize(real.join("lib.js")).unwrap()]);
        let engine = Arc::new(CountingEngine::default());
        let rebuild = rebuild_loop(engine, vec![link.join("app.js")]).seeded(&seed);

        assert!(rebuild.is_relevant(&link.join("lib.js")));
        assert!(!rebuild.is_relevant(&link.join("other.js")));
    }

    #[tokio::test]
    async fn test_rebuild_all_replaces_graph() {
        let engine = Arc::new(CountingEngine {
            fail: true,
            ..Default::default()
        });
        let mut rebuild = rebuild_loop(engine, vec![PathBuf::from("/project/a.js")]);
        let mut handler = Recording::default();

        rebuild.rebuild_all(&mut handler).await.unwrap();

        assert_eq!(handler.results.len(), 1);
        assert!(handler.results[0].has_errors());
        assert!(rebuild.is_relevant(Path::new("/project/shared.js")));
        assert!(rebuild.is_relevant(Path::new("/project/other.ts")));
    }

    #[tokio::test]
    async fn test_cancel_without_changes() {
        let engine = Arc::new(CountingEngine::default());
        let mut rebuild = rebuild_loop(Arc::clone(&engine), vec![PathBuf::from("/project/a.js")]);
        let (_tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut handler = Recording::default();
        rebuild.run(rx, &mut handler, cancel).await.unwrap();

        assert!(engine.built.lock().is_empty());
        assert_eq!(handler.shutdowns, 1);
    }

    #[tokio::test]
    async fn test_closed_channel_waits_for_cancel() {
        let engine = Arc::new(CountingEngine::default());
        let mut rebuild = rebuild_loop(engine, vec![PathBuf::from("/project/a.js")]);
        let (tx, rx) = mpsc::channel::<FileChange>(16);
        drop(tx);
        let cancel = CancellationToken::new();

        let stop = cancel.clone();
        let run = tokio::spawn(async move {
            let mut handler = Recording::default();
            rebuild.run(rx, &mut handler, stop).await.unwrap();
            handler.shutdowns
        });

        tokio::task::yield_now().await;
        assert!(!run.is_finished());
        cancel.cancel();
        assert_eq!(run.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_handler_error_ends_loop() {
        struct Failing;

        #[async_trait]
        impl RebuildHandler for Failing {
            async fn on_rebuild(&mut self, _result: &BuildResult) -> Result<()> {
                Err(crate::error::CliError::Server("node is gone".to_string()))
            }
        }

        let engine = Arc::new(CountingEngine::default());
        let mut rebuild = rebuild_loop(engine, vec![PathBuf::from("/project/a.js")]);
        let (tx, rx) = mpsc::channel(16);
        tx.send(FileChange::Created(PathBuf::from("/project/a.js"))).await.unwrap();

        let result = rebuild.run(rx, &mut Failing, CancellationToken::new()).await;
        assert!(result.is_err());
    }
}
