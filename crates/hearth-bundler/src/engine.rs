//! The bundling engine contract and its Rolldown implementation.
//!
//! The orchestrator talks to the engine through [`Engine`] only. A build
//! never fails at the type level: every problem (unresolved imports, parse
//! errors, write failures) comes back as a [`Diagnostic`] inside the
//! [`BuildResult`], so callers can decide how loud to be about it.

use async_trait::async_trait;
use rolldown::{
    Bundler as RolldownBundler, BundlerBuilder as RolldownBundlerBuilder, BundlerOptions,
    InputItem, IsExternal, RawMinifyOptions, ResolveOptions,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::diagnostics::{self, Diagnostic};
use crate::options::{BuildOptions, SOURCE_EXTENSIONS};
use crate::output::write_bundle_to;
use crate::plugins::{DefinePlugin, PluginRegistry, ResolutionPolicyPlugin};
use crate::resolve::ResolutionPolicy;
use crate::{Error, Result};

/// A single build invocation.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Entry module, absolute.
    pub entry: PathBuf,
    pub options: Arc<BuildOptions>,
    /// Consulted before the engine's own resolver.
    pub policy: ResolutionPolicy,
}

/// A file the engine wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    pub is_source_map: bool,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_source_map = path.extension().is_some_and(|ext| ext == "map");
        Self {
            path,
            is_source_map,
        }
    }
}

/// Outcome of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub output_files: Vec<OutputFile>,
    pub errors: Vec<Diagnostic>,
    /// Source files the build read from disk. Filled in even when the build
    /// failed part way, as far as loading got.
    #[serde(default)]
    pub watch_files: Vec<PathBuf>,
}

impl BuildResult {
    pub fn success(output_files: Vec<OutputFile>) -> Self {
        Self {
            output_files,
            ..Default::default()
        }
    }

    pub fn failed(errors: Vec<Diagnostic>) -> Self {
        Self {
            errors,
            ..Default::default()
        }
    }

    pub fn with_watch_files(mut self, files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.watch_files.extend(files);
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fold another build into this one, keeping the order of both.
    /// Watch files already present are not repeated.
    pub fn merge(&mut self, other: BuildResult) {
        self.output_files.extend(other.output_files);
        self.errors.extend(other.errors);
        for file in other.watch_files {
            if !self.watch_files.contains(&file) {
                self.watch_files.push(file);
            }
        }
    }
}

/// A bundling engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Bundle `request.entry` and write the output to `request.options.out_dir`.
    async fn build(&self, request: BuildRequest) -> BuildResult;
}

/// [`Engine`] backed by Rolldown.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownEngine;

impl RolldownEngine {
    pub fn new() -> Self {
        Self
    }

    fn bundler(&self, request: &BuildRequest) -> Result<RolldownBundler> {
        let options = configure_rolldown_options(&request.entry, &request.options);

        let mut registry = PluginRegistry::new();
        registry.add(ResolutionPolicyPlugin::new(request.policy.clone()));
        let define = DefinePlugin::new(&request.options.define);
        if !define.is_empty() {
            registry.add(define);
        }

        RolldownBundlerBuilder::default()
            .with_options(options)
            .with_plugins(registry.into_rolldown_plugins())
            .build()
            .map_err(|e| Error::from_rolldown_batch(&e))
    }

    /// Generate and write. Returns the written paths and the modules read.
    async fn try_build(&self, request: &BuildRequest) -> (Result<Vec<PathBuf>>, Vec<PathBuf>) {
        let mut bundler = match self.bundler(request) {
            Ok(bundler) => bundler,
            Err(e) => return (Err(e), Vec::new()),
        };

        let generated = bundler.generate().await;
        let watch_files = watched_modules(&bundler);

        let written = generated
            .map_err(|e| Error::from_rolldown_batch(&e))
            .and_then(|output| {
                for warning in &output.warnings {
                    for diagnostic in diagnostics::extract_from_rolldown_error(warning) {
                        tracing::warn!(entry = %request.entry.display(), "{}", diagnostic);
                    }
                }
                write_bundle_to(&output, &request.options.out_dir)
            });

        (written, watch_files)
    }
}

/// Absolute on-disk modules of the last bundle, sorted.
fn watched_modules(bundler: &RolldownBundler) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = bundler
        .watch_files()
        .iter()
        .map(|id| PathBuf::from(id.key().as_str()))
        .filter(|path| path.is_absolute())
        .collect();
    files.sort();
    files
}

#[async_trait]
impl Engine for RolldownEngine {
    async fn build(&self, request: BuildRequest) -> BuildResult {
        let started = std::time::Instant::now();
        let (written, watch_files) = self.try_build(&request).await;
        let result = match written {
            Ok(paths) => BuildResult::success(paths.into_iter().map(OutputFile::new).collect()),
            Err(Error::Bundler(errors)) => BuildResult::failed(errors),
            Err(other) => BuildResult::failed(vec![
                Diagnostic::new(other.to_string()).at(request.entry.display().to_string(), None, None),
            ]),
        }
        .with_watch_files(watch_files);

        tracing::debug!(
            entry = %request.entry.display(),
            files = result.output_files.len(),
            errors = result.errors.len(),
            watched = result.watch_files.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "build finished"
        );
        result
    }
}

/// Translate [`BuildOptions`] into Rolldown's option struct.
fn configure_rolldown_options(entry: &Path, options: &BuildOptions) -> BundlerOptions {
    let name = entry
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());

    BundlerOptions {
        input: Some(vec![InputItem {
            name,
            import: entry.to_string_lossy().into_owned(),
        }]),
        cwd: Some(options.cwd.clone()),
        format: Some(options.format.to_rolldown()),
        platform: Some(options.platform.to_rolldown()),
        sourcemap: options.sourcemap.map(|s| s.to_rolldown()),
        external: Some(IsExternal::from(options.external.clone())),
        minify: options.minify.then(|| RawMinifyOptions::from(true)),
        resolve: Some(configure_resolution(options)),
        ..Default::default()
    }
}

fn configure_resolution(options: &BuildOptions) -> ResolveOptions {
    let to_strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    ResolveOptions {
        main_fields: Some(to_strings(options.platform.main_fields())),
        condition_names: Some(to_strings(options.platform.conditions())),
        extensions: Some(
            SOURCE_EXTENSIONS
                .iter()
                .map(|ext| format!(".{ext}"))
                .collect(),
        ),
        modules: Some(options.module_paths()),
        symlinks: Some(true),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OutputFormat, Platform, SourceMap};

    #[test]
    fn test_output_file_detects_source_maps() {
        assert!(OutputFile::new("/out/main.js.map").is_source_map);
        assert!(!OutputFile::new("/out/main.js").is_source_map);
    }

    #[test]
    fn test_build_result_constructors() {
        let ok = BuildResult::success(vec![OutputFile::new("/out/a.js")]);
        assert!(!ok.has_errors());

        let failed = BuildResult::failed(vec![Diagnostic::new("boom")]);
        assert!(failed.has_errors());
        assert!(failed.output_files.is_empty());
    }

    #[test]
    fn test_merge_keeps_order_and_dedupes_watch_files() {
        let mut combined = BuildResult::success(vec![OutputFile::new("/out/a.js")])
            .with_watch_files([PathBuf::from("/src/a.js"), PathBuf::from("/src/shared.js")]);
        combined.merge(
            BuildResult::failed(vec![Diagnostic::new("boom")])
                .with_watch_files([PathBuf::from("/src/shared.js"), PathBuf::from("/src/b.js")]),
        );

        assert_eq!(combined.output_files, vec![OutputFile::new("/out/a.js")]);
        assert!(combined.has_errors());
        assert_eq!(
            combined.watch_files,
            vec![
                PathBuf::from("/src/a.js"),
                PathBuf::from("/src/shared.js"),
                PathBuf::from("/src/b.js"),
            ]
        );
    }

    #[test]
    fn test_configure_rolldown_options() {
        let options = BuildOptions::new("/project", "/project/dist")
            .format(OutputFormat::Cjs)
            .platform(Platform::Node)
            .external(["express"])
            .sourcemap(Some(SourceMap::External))
            .minify(true);

        let rolldown = configure_rolldown_options(Path::new("/project/src/server.js"), &options);
        let input = rolldown.input.unwrap();
        assert_eq!(input.len(), 1);
        assert_eq!(input[0].name.as_deref(), Some("server"));
        assert_eq!(input[0].import, "/project/src/server.js");
        assert_eq!(rolldown.cwd, Some(PathBuf::from("/project")));
        assert!(rolldown.minify.is_some());

        let resolve = rolldown.resolve.unwrap();
        assert_eq!(
            resolve.condition_names.unwrap().first().map(String::as_str),
            Some("node")
        );
    }

    #[test]
    fn test_no_minify_by_default() {
        let options = BuildOptions::new("/project", "/project/dist");
        let rolldown = configure_rolldown_options(Path::new("/project/index.js"), &options);
        assert!(rolldown.minify.is_none());
        assert!(rolldown.sourcemap.is_none());
    }
}
