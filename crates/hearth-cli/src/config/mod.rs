//! Configuration system for hearth with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and a config file.
//! Priority: CLI > Environment > File > Defaults
//!
//! The merged [`HearthConfig`] is then resolved against the working
//! directory and `package.json` into the immutable [`OrchestratorConfig`]
//! every mode runs from.

mod conversions;
mod defaults;
mod loading;
mod manifest;
mod validation;

use hearth_bundler::BuildOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::{Format, LogLevel, Platform, SourceMapMode};

pub use defaults::*;
pub use manifest::{MANIFEST_FILE_NAME, Manifest};

/// hearth configuration - loaded from hearth.config.json, `HEARTH_*` and CLI args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HearthConfig {
    /// Entry module or HTML document
    #[serde(default = "default_entry")]
    pub entry: PathBuf,

    /// Dev server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Dev server port
    #[schemars(range(min = 1))]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Watch and serve or run the entry
    #[serde(default)]
    pub serve: bool,

    /// Serve over HTTPS
    #[serde(default)]
    pub secure: bool,

    /// Output directory, relative to the working directory
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Output format (esm, cjs, iife)
    #[serde(default = "default_format")]
    pub format: Format,

    /// Target platform
    #[serde(default = "default_platform")]
    pub platform: Platform,

    /// Packages to exclude from the bundle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external: Vec<String>,

    /// Identifier replacements
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub define: BTreeMap<String, String>,

    /// Source map mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<SourceMapMode>,

    /// Enable minification
    #[serde(default)]
    pub minify: bool,

    /// Operator output verbosity
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl Default for HearthConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            host: default_host(),
            port: default_port(),
            serve: false,
            secure: false,
            out_dir: default_out_dir(),
            format: default_format(),
            platform: default_platform(),
            external: Vec::new(),
            define: BTreeMap::new(),
            sourcemap: None,
            minify: false,
            log_level: default_log_level(),
        }
    }
}

impl HearthConfig {
    /// Generate JSON Schema for hearth.config.json.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(HearthConfig)).unwrap_or_default()
    }
}

/// A layer of explicitly set values.
///
/// Used for the environment and CLI layers so that unset values don't
/// shadow the file. Field names accept both the camelCase config spelling
/// and the snake_case spelling `HEARTH_*` variables produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serve: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(alias = "out_dir", alias = "outdir", skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub define: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<SourceMapMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    #[serde(alias = "log_level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

/// Which of the four terminal behaviours a run takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Bundle a module once.
    BuildEntry,
    /// Bundle a module, run it with node, restart on change.
    RunEntry,
    /// Render an HTML document once.
    BuildIndex,
    /// Render an HTML document and serve it with live reload.
    ServeIndex,
}

impl Mode {
    pub fn from_entry(entry: &Path, serve: bool) -> Self {
        let is_html = entry.extension().is_some_and(|ext| ext == "html");
        match (is_html, serve) {
            (false, false) => Mode::BuildEntry,
            (false, true) => Mode::RunEntry,
            (true, false) => Mode::BuildIndex,
            (true, true) => Mode::ServeIndex,
        }
    }

    pub fn watches(self) -> bool {
        matches!(self, Mode::RunEntry | Mode::ServeIndex)
    }
}

/// Fully resolved settings for one run. Never mutated once built.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Absolute path of the entry module or document.
    pub entry: PathBuf,
    pub host: String,
    pub port: u16,
    pub serve: bool,
    pub secure: bool,
    pub build: Arc<BuildOptions>,
    pub log_level: LogLevel,
    /// Parsed `package.json`, if the project has one.
    pub manifest: Option<Manifest>,
}

impl OrchestratorConfig {
    pub fn mode(&self) -> Mode {
        Mode::from_entry(&self.entry, self.serve)
    }

    pub fn cwd(&self) -> &Path {
        &self.build.cwd
    }

    pub fn out_dir(&self) -> &Path {
        &self.build.out_dir
    }

    /// The template context for HTML entries.
    pub fn template_context(&self) -> serde_json::Value {
        self.manifest
            .as_ref()
            .map(|m| m.raw.clone())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }
}
