//! The project's `package.json`.
//!
//! Only a few fields matter to the orchestrator; the full document is kept
//! as raw JSON because it doubles as the HTML template context.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

pub const MANIFEST_FILE_NAME: &str = "package.json";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub path: PathBuf,
    pub name: Option<String>,
    pub version: Option<String>,
    /// Runtime dependencies, name to version range.
    pub dependencies: BTreeMap<String, String>,
    /// The whole document.
    pub raw: Value,
}

impl Manifest {
    /// Load `package.json` from `dir`.
    ///
    /// A missing file is not an error and yields `Ok(None)`. A file that
    /// exists but isn't a JSON object is a configuration error.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::Io(e).into()),
        };

        Self::parse(&path, &contents).map(Some)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let invalid = |error: String| ConfigError::InvalidManifest {
            path: path.to_path_buf(),
            error,
        };

        let raw: Value = serde_json::from_str(contents).map_err(|e| invalid(e.to_string()))?;
        if !raw.is_object() {
            return Err(invalid("expected a JSON object".to_string()).into());
        }

        let name = raw.get("name").and_then(Value::as_str).map(str::to_string);
        let version = raw
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string);

        let dependencies = match raw.get("dependencies") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(deps) => serde_json::from_value(deps.clone())
                .map_err(|e| invalid(format!("dependencies: {e}")))?,
        };

        Ok(Self {
            path: path.to_path_buf(),
            name,
            version,
            dependencies,
            raw,
        })
    }

    /// Names of runtime dependencies, sorted.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }
}
