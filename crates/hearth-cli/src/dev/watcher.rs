//! File system watcher for watch mode.
//!
//! Watches the entire project directory and filters changes to relevant files,
//! ignoring node_modules, the output directory, hidden paths and any other
//! configured names.

use crate::error::{Result, ResultExt};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Directory names ignored in every project.
pub const DEFAULT_IGNORES: &[&str] = &["node_modules"];

/// Per-path debounce applied inside the watcher callback.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// File was modified
    Modified(PathBuf),
    /// File was created
    Created(PathBuf),
    /// File was removed
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Recursive file watcher with filtering.
///
/// Changes are delivered through the receiver returned by [`FileWatcher::new`]
/// for as long as the watcher is alive.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Create a new file watcher.
    ///
    /// `ignore` holds paths relative to `root` (like `dist` or
    /// `node_modules`); any change at or below one of them is dropped. Hidden
    /// files and directories are always dropped.
    ///
    /// # Errors
    ///
    /// Returns error if watcher cannot be created or directory doesn't exist
    pub fn new(
        root: PathBuf,
        ignore: Vec<PathBuf>,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        std::fs::metadata(&root).with_path(&root)?;

        let (tx, rx) = mpsc::channel(100);

        let mut last_event: Option<(PathBuf, Instant)> = None;
        let callback_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "watch error");
                    return;
                }
            };

            for path in &event.paths {
                if should_ignore(path, &callback_root, &ignore) {
                    continue;
                }

                // Debounce: skip if same file changed within debounce window
                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                last_event = Some((path.clone(), now));

                // Runs on notify's thread, so blocking is fine.
                if tx.blocking_send(change).is_err() {
                    return;
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Ignore list for a project whose output goes to `out_dir`.
///
/// `out_dir` is dropped from the list when it lies outside `root`.
pub fn ignore_list(root: &Path, out_dir: &Path) -> Vec<PathBuf> {
    let mut ignore: Vec<PathBuf> = DEFAULT_IGNORES.iter().map(PathBuf::from).collect();
    if let Ok(relative) = out_dir.strip_prefix(root) {
        if !relative.as_os_str().is_empty() {
            ignore.push(relative.to_path_buf());
        }
    }
    ignore
}

/// Check if a path should be ignored.
fn should_ignore(path: &Path, root: &Path, ignore: &[PathBuf]) -> bool {
    // Only watch files within root
    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };

    if ignore.iter().any(|ignored| rel_path.starts_with(ignored)) {
        return true;
    }

    // node_modules and hidden names anywhere in the tree
    rel_path.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name.starts_with('.') || DEFAULT_IGNORES.contains(&name.as_ref())
        }
        _ => false,
    })
}
