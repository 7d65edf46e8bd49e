//! Resolution policy consulted before the engine's own resolver.
//!
//! Two rules are installed, in order:
//!
//! 1. [`RootedSourceRule`] maps `src/...` specifiers onto the working
//!    directory, whoever imports them.
//! 2. [`DirectoryIndexRule`] lets `./widgets` stand for
//!    `./widgets/widgets.js` when `widgets` is a directory.
//!
//! A rule answers with [`Resolution::Resolved`], [`Resolution::Defer`] (no
//! opinion, ask the next rule or the engine), or an I/O error which the
//! engine reports against the importing module.

use path_clean::PathClean;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extension appended to extensionless specifiers.
pub const DEFAULT_EXTENSION: &str = "js";

/// Outcome of a single resolution rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The specifier maps to this absolute path.
    Resolved(PathBuf),
    /// No opinion; try the next rule.
    Defer,
}

/// One rule of the resolution policy.
pub trait ResolveRule: Send + Sync + fmt::Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Resolve `specifier` as imported from a module living in `importer_dir`.
    ///
    /// `importer_dir` is `None` for entry points.
    fn resolve(&self, specifier: &str, importer_dir: Option<&Path>) -> io::Result<Resolution>;
}

/// Rule A: `src/` specifiers resolve against the working directory.
#[derive(Debug, Clone)]
pub struct RootedSourceRule {
    prefix: String,
    root: PathBuf,
}

impl RootedSourceRule {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            prefix: "src/".to_string(),
            root: root.into(),
        }
    }
}

impl ResolveRule for RootedSourceRule {
    fn name(&self) -> &'static str {
        "rooted-source"
    }

    fn resolve(&self, specifier: &str, _importer_dir: Option<&Path>) -> io::Result<Resolution> {
        if !specifier.starts_with(&self.prefix) {
            return Ok(Resolution::Defer);
        }

        let joined = self.root.join(specifier);
        if has_extension(specifier) {
            return Ok(Resolution::Resolved(joined));
        }

        Ok(Resolution::Resolved(with_default_extension(joined)))
    }
}

/// Rule B: a directory import resolves to `<dir>/<basename>.js`.
///
/// A missing path defers rather than failing, since the engine's resolver
/// may still satisfy the specifier (bare package names, extension probing).
#[derive(Debug, Clone, Default)]
pub struct DirectoryIndexRule;

impl ResolveRule for DirectoryIndexRule {
    fn name(&self) -> &'static str {
        "directory-index"
    }

    fn resolve(&self, specifier: &str, importer_dir: Option<&Path>) -> io::Result<Resolution> {
        let Some(importer_dir) = importer_dir else {
            return Ok(Resolution::Defer);
        };

        let candidate = importer_dir.join(specifier).clean();
        let metadata = match std::fs::metadata(&candidate) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Resolution::Defer),
            Err(e) => return Err(e),
        };

        if !metadata.is_dir() || has_extension(specifier) {
            return Ok(Resolution::Defer);
        }

        let Some(basename) = candidate.file_name() else {
            return Ok(Resolution::Defer);
        };
        let mut index = OsString::from(basename);
        index.push(".");
        index.push(DEFAULT_EXTENSION);

        Ok(Resolution::Resolved(candidate.join(index)))
    }
}

/// Ordered set of resolution rules.
#[derive(Debug, Clone)]
pub struct ResolutionPolicy {
    rules: Vec<Arc<dyn ResolveRule>>,
}

impl ResolutionPolicy {
    /// Policy with no rules; every specifier is deferred.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The rooted-source rule followed by the directory-index rule.
    pub fn standard(root: impl Into<PathBuf>) -> Self {
        Self::empty()
            .with_rule(RootedSourceRule::new(root))
            .with_rule(DirectoryIndexRule)
    }

    /// Append a rule; rules are consulted in insertion order.
    pub fn with_rule(mut self, rule: impl ResolveRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn rules(&self) -> &[Arc<dyn ResolveRule>] {
        &self.rules
    }

    /// Consult each rule in turn until one has an opinion.
    ///
    /// The first error aborts resolution for this specifier.
    pub fn resolve(&self, specifier: &str, importer_dir: Option<&Path>) -> io::Result<Resolution> {
        for rule in &self.rules {
            match rule.resolve(specifier, importer_dir)? {
                Resolution::Defer => continue,
                resolved => {
                    tracing::debug!(rule = rule.name(), specifier, ?resolved, "resolved");
                    return Ok(resolved);
                }
            }
        }
        Ok(Resolution::Defer)
    }
}

fn has_extension(specifier: &str) -> bool {
    Path::new(specifier).extension().is_some()
}

fn with_default_extension(path: PathBuf) -> PathBuf {
    let mut raw = path.into_os_string();
    raw.push(".");
    raw.push(DEFAULT_EXTENSION);
    PathBuf::from(raw)
}
