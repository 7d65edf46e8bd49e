//! Per-render state and the template functions bound to it.

use hearth_bundler::{ArtifactBuilder, BuildResult, OutputFormat};
use minijinja::{Environment, Value};
use parking_lot::Mutex;
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::dev::LiveReload;
use crate::html::copy::StagedCopies;
use crate::logger::Logger;

/// State for one render of the entry document.
///
/// Created fresh for every render; nothing carries over between rebuilds.
/// Template functions run on a blocking thread and drive async builds
/// through `handle`.
#[derive(Debug)]
pub struct RenderSession {
    builder: ArtifactBuilder,
    logger: Logger,
    handle: Handle,
    entry_dir: PathBuf,
    serve: bool,
    references: Mutex<Vec<PathBuf>>,
    builds: Mutex<BuildResult>,
    copies: Mutex<StagedCopies>,
}

impl RenderSession {
    pub fn new(
        builder: ArtifactBuilder,
        entry: &Path,
        serve: bool,
        logger: Logger,
        handle: Handle,
    ) -> Self {
        let entry_dir = entry.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            builder,
            logger,
            handle,
            entry_dir,
            serve,
            references: Mutex::new(Vec::new()),
            builds: Mutex::new(BuildResult::default()),
            copies: Mutex::new(StagedCopies::default()),
        }
    }

    /// Render `source` with `context`. Blocks; call from a blocking thread.
    pub fn render(
        self: &Arc<Self>,
        name: &str,
        source: &str,
        context: &serde_json::Value,
    ) -> Result<String, minijinja::Error> {
        let mut env = Environment::new();

        let session = Arc::clone(self);
        env.add_function("livereload", move || session.livereload());

        let session = Arc::clone(self);
        env.add_function("build", move |specifier: String, with_tag: Option<bool>| {
            session.build(&specifier, with_tag.unwrap_or(true))
        });

        let session = Arc::clone(self);
        env.add_function("copy", move |asset: String| session.copy(&asset));

        env.add_template_owned(name.to_string(), source.to_string())?;
        env.get_template(name)?.render(context)
    }

    /// Entry references discovered so far, every build merged into one
    /// result, and the copies started.
    pub fn finish(&self) -> (Vec<PathBuf>, BuildResult, StagedCopies) {
        let references = std::mem::take(&mut *self.references.lock());
        let builds = std::mem::take(&mut *self.builds.lock());
        let copies = std::mem::take(&mut *self.copies.lock());
        (references, builds, copies)
    }

    fn livereload(&self) -> Value {
        if self.serve {
            Value::from_safe_string(LiveReload::snippet())
        } else {
            Value::from("")
        }
    }

    fn build(&self, specifier: &str, with_tag: bool) -> Value {
        let entry = self.entry_dir.join(specifier).clean();
        tracing::debug!(entry = %entry.display(), "building template reference");

        let (artifacts, result) = self.handle.block_on(self.builder.build(&entry));
        for diagnostic in &result.errors {
            self.logger.error(&diagnostic.to_string());
        }

        if self.serve {
            let mut references = self.references.lock();
            if !references.contains(&entry) {
                references.push(entry);
            }
        }

        let esm = self.builder.options().format == OutputFormat::Esm;
        let output = if with_tag {
            render_tags(&artifacts, esm)
        } else {
            artifacts
                .first()
                .map(|artifact| escape_html(&artifact_url(artifact)))
                .unwrap_or_default()
        };
        self.builds.lock().merge(result);
        Value::from_safe_string(output)
    }

    fn copy(&self, asset: &str) -> Value {
        self.copies.lock().stage(
            &self.handle,
            &self.entry_dir,
            &self.builder.options().out_dir,
            asset,
            self.logger,
        );
        Value::from_safe_string(escape_html(asset))
    }
}

/// Root-absolute URL of an artifact.
fn artifact_url(artifact: &str) -> String {
    format!("/{}", artifact.trim_start_matches('/'))
}

/// Script and stylesheet tags for a list of artifacts.
pub(crate) fn render_tags(artifacts: &[String], esm: bool) -> String {
    let mut tags = Vec::new();
    for artifact in artifacts {
        let url = escape_html(&artifact_url(artifact));
        if artifact.ends_with(".js") {
            if esm {
                tags.push(format!(r#"<script type="module" src="{url}"></script>"#));
            } else {
                tags.push(format!(r#"<script src="{url}"></script>"#));
            }
        } else if artifact.ends_with(".css") {
            tags.push(format!(r#"<link rel="stylesheet" href="{url}">"#));
        }
    }
    tags.join("\n")
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
