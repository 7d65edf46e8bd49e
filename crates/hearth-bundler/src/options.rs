//! Build options shared by every engine invocation of a run.
//!
//! Options are assembled once by the orchestrator and then shared as
//! `Arc<BuildOptions>`; engines only ever read them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Extensions the resolver tries, without the leading dot.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "jsx", "ts", "tsx", "json", "css"];

/// Output module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Esm,
    Cjs,
    Iife,
}

impl OutputFormat {
    pub(crate) fn to_rolldown(self) -> rolldown::OutputFormat {
        match self {
            Self::Esm => rolldown::OutputFormat::Esm,
            Self::Cjs => rolldown::OutputFormat::Cjs,
            Self::Iife => rolldown::OutputFormat::Iife,
        }
    }
}

/// Target platform. Decides export conditions and main fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Browser,
    Node,
    Neutral,
}

impl Platform {
    pub(crate) fn to_rolldown(self) -> rolldown::Platform {
        match self {
            Self::Browser => rolldown::Platform::Browser,
            Self::Node => rolldown::Platform::Node,
            Self::Neutral => rolldown::Platform::Neutral,
        }
    }

    /// Export conditions, most specific first.
    pub fn conditions(self) -> &'static [&'static str] {
        match self {
            Self::Browser => &["browser", "import", "module", "default"],
            Self::Node => &["node", "import", "module", "default"],
            Self::Neutral => &["import", "module", "default"],
        }
    }

    pub fn main_fields(self) -> &'static [&'static str] {
        match self {
            Self::Browser => &["browser", "module", "main"],
            Self::Node | Self::Neutral => &["module", "main"],
        }
    }
}

/// Source map emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMap {
    /// Embedded as a data URL in the output.
    Inline,
    /// Separate `.map` file with a `sourceMappingURL` comment.
    External,
    /// Separate `.map` file without the comment.
    Hidden,
}

impl SourceMap {
    pub(crate) fn to_rolldown(self) -> rolldown::SourceMapType {
        match self {
            Self::Inline => rolldown::SourceMapType::Inline,
            Self::External => rolldown::SourceMapType::File,
            Self::Hidden => rolldown::SourceMapType::Hidden,
        }
    }
}

/// Options forwarded to the bundling engine.
///
/// ```
/// use hearth_bundler::{BuildOptions, Platform};
///
/// let options = BuildOptions::new("/project", "/project/dist")
///     .platform(Platform::Node)
///     .external(["express"])
///     .define("process.env.NODE_ENV", "'production'");
/// assert_eq!(options.external, vec!["express".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Absolute output directory.
    pub out_dir: PathBuf,
    /// Project root; `src/` specifiers resolve against it.
    pub cwd: PathBuf,
    pub format: OutputFormat,
    pub platform: Platform,
    /// Module specifiers left out of the bundle.
    pub external: Vec<String>,
    /// Textual substitutions applied to script modules.
    pub define: BTreeMap<String, String>,
    pub sourcemap: Option<SourceMap>,
    pub minify: bool,
}

impl BuildOptions {
    pub fn new(cwd: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            cwd: cwd.into(),
            format: OutputFormat::default(),
            platform: Platform::default(),
            external: Vec::new(),
            define: BTreeMap::new(),
            sourcemap: None,
            minify: false,
        }
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Add externals, skipping duplicates.
    pub fn external<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for package in packages {
            let package = package.into();
            if !self.external.contains(&package) {
                self.external.push(package);
            }
        }
        self
    }

    pub fn define(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.define.insert(key.into(), value.into());
        self
    }

    pub fn sourcemap(mut self, sourcemap: Option<SourceMap>) -> Self {
        self.sourcemap = sourcemap;
        self
    }

    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// `node_modules` lookup paths from `cwd` up to the filesystem root.
    pub(crate) fn module_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .cwd
            .ancestors()
            .map(|dir: &Path| dir.join("node_modules").to_string_lossy().into_owned())
            .collect();
        paths.push("node_modules".to_string());
        paths
    }
}
