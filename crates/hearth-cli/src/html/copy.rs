//! Static asset copies requested by `copy()` calls in the entry document.

use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};
use tokio::task::JoinHandle;

use crate::logger::Logger;

/// Outcome of every staged copy once joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Assets written, as requested in the template.
    pub copied: Vec<String>,
    /// Assets that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl CopyReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
struct StagedCopy {
    asset: String,
    handle: JoinHandle<Result<(), String>>,
}

/// Copies started during a render.
///
/// Each copy runs as its own task. Callers either [`join`](Self::join) them
/// (one-shot builds, so the process doesn't exit mid-write) or
/// [`detach`](Self::detach) them (serve mode). Failures are logged as they
/// happen either way.
#[derive(Debug, Default)]
pub struct StagedCopies {
    staged: Vec<StagedCopy>,
    rejected: Vec<(String, String)>,
}

impl StagedCopies {
    pub fn len(&self) -> usize {
        self.staged.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start copying `source_dir/asset` to `out_dir/asset` on `handle`.
    pub(crate) fn stage(
        &mut self,
        handle: &tokio::runtime::Handle,
        source_dir: &Path,
        out_dir: &Path,
        asset: &str,
        logger: Logger,
    ) {
        let Some(relative) = contained_path(asset) else {
            let reason = "path escapes the output directory".to_string();
            logger.error(&format!("Copy of {asset} rejected: {reason}"));
            self.rejected.push((asset.to_string(), reason));
            return;
        };

        let source = source_dir.join(&relative);
        let target = out_dir.join(&relative);
        let name = asset.to_string();

        let task = handle.spawn(async move {
            let result = copy_file(&source, &target).await;
            match &result {
                Ok(()) => tracing::debug!(asset = %name, "copied"),
                Err(reason) => logger.error(&format!("Copy of {name} failed: {reason}")),
            }
            result
        });

        self.staged.push(StagedCopy {
            asset: asset.to_string(),
            handle: task,
        });
    }

    /// Wait for every copy to finish.
    pub async fn join(self) -> CopyReport {
        let mut report = CopyReport {
            copied: Vec::new(),
            failed: self.rejected,
        };

        for StagedCopy { asset, handle } in self.staged {
            match handle.await {
                Ok(Ok(())) => report.copied.push(asset),
                Ok(Err(reason)) => report.failed.push((asset, reason)),
                Err(join_err) => report.failed.push((asset, join_err.to_string())),
            }
        }

        report
    }

    /// Let the copies finish on their own. Nobody observes the outcome
    /// beyond the error log.
    pub fn detach(self) {
        drop(self.staged);
    }
}

/// `asset` as a relative path that stays inside its base directory.
fn contained_path(asset: &str) -> Option<PathBuf> {
    let cleaned = Path::new(asset).clean();
    let mut components = cleaned.components();
    let stays_inside = components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    (stays_inside && cleaned != Path::new(".") && !asset.is_empty()).then_some(cleaned)
}

async fn copy_file(source: &Path, target: &Path) -> Result<(), String> {
    let contents = tokio::fs::read(source)
        .await
        .map_err(|e| format!("{}: {e}", source.display()))?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("{}: {e}", parent.display()))?;
    }

    tokio::fs::write(target, contents)
        .await
        .map_err(|e| format!("{}: {e}", target.display()))
}
