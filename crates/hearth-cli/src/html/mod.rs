//! HTML entry documents.
//!
//! The entry document is a minijinja template. Three functions are
//! available to it:
//!
//! - `build(specifier, with_tag=true)` bundles a module next to the document
//!   and emits `<script>`/`<link>` tags for its output, or the first
//!   artifact's URL when `with_tag` is false.
//! - `copy(asset)` copies a file next to the document into the output
//!   directory and returns `asset`.
//! - `livereload()` emits the live-reload client in serve mode.
//!
//! The package manifest is the template context, so `{{ name }}` and
//! `{{ version }}` work as expected.
//!
//! ```html
//! <!doctype html>
//! <title>{{ name }}</title>
//! {{ build("./src/main.js") }}
//! <link rel="icon" href="{{ copy('favicon.ico') }}">
//! {{ livereload() }}
//! ```

mod copy;
mod session;

use hearth_bundler::{ArtifactBuilder, BuildResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::error::{BuildError, CliError, Result, ResultExt};
use crate::logger::Logger;

pub use copy::{CopyReport, StagedCopies};
pub use session::RenderSession;

/// Name of the rendered document inside the output directory.
pub const INDEX_FILE_NAME: &str = "index.html";

/// What a render produced.
#[derive(Debug)]
pub struct IndexOutput {
    /// Absolute paths of every module the document built, in first-call
    /// order and without repeats. Only collected in serve mode.
    pub references: Vec<PathBuf>,
    /// Every build the document ran, merged.
    pub builds: BuildResult,
    pub copies: StagedCopies,
    pub index_path: PathBuf,
}

/// Render the entry document into `out_dir/index.html`.
///
/// Each `build()` call in the template runs one artifact build. Build
/// diagnostics are logged and never fail the render; a missing entry, a
/// template error or an unwritable output does.
pub async fn render_index(
    config: &OrchestratorConfig,
    builder: &ArtifactBuilder,
    logger: Logger,
) -> Result<IndexOutput> {
    let entry = &config.entry;
    let source = read_entry(entry).await?;
    let name = entry
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| INDEX_FILE_NAME.to_string());

    let session = Arc::new(RenderSession::new(
        builder.clone(),
        entry,
        config.serve,
        logger,
        tokio::runtime::Handle::current(),
    ));
    let context = config.template_context();

    let rendered = {
        let session = Arc::clone(&session);
        tokio::task::spawn_blocking(move || session.render(&name, &source, &context))
            .await
            .map_err(|e| CliError::Custom(format!("Render task failed: {e}")))??
    };

    let out_dir = config.out_dir();
    let index_path = out_dir.join(INDEX_FILE_NAME);
    write_index(out_dir, &index_path, rendered).await?;

    let (references, builds, copies) = session.finish();
    tracing::debug!(
        references = references.len(),
        copies = copies.len(),
        "rendered {}",
        index_path.display()
    );

    Ok(IndexOutput {
        references,
        builds,
        copies,
        index_path,
    })
}

async fn read_entry(entry: &Path) -> Result<String> {
    tokio::fs::read_to_string(entry)
        .await
        .with_path(entry)
        .map_err(|e| match e {
            CliError::FileNotFound(path) => BuildError::EntryNotFound(path).into(),
            other => other,
        })
}

async fn write_index(out_dir: &Path, index_path: &Path, rendered: String) -> Result<()> {
    let not_writable = |_| BuildError::OutputNotWritable(index_path.to_path_buf());

    tokio::fs::create_dir_all(out_dir).await.map_err(not_writable)?;
    tokio::fs::write(index_path, rendered)
        .await
        .map_err(not_writable)?;
    Ok(())
}
