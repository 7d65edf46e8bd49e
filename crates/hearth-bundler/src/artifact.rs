//! One engine invocation per entry, reduced to the artifact list callers use.

use std::path::{Component, Path};
use std::sync::Arc;

use crate::engine::{BuildRequest, BuildResult, Engine, OutputFile};
use crate::options::BuildOptions;
use crate::resolve::ResolutionPolicy;

/// Builds entries against shared, read-only options.
///
/// Cloning is cheap; clones share the engine and options.
#[derive(Clone)]
pub struct ArtifactBuilder {
    engine: Arc<dyn Engine>,
    options: Arc<BuildOptions>,
    policy: ResolutionPolicy,
}

impl std::fmt::Debug for ArtifactBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBuilder")
            .field("options", &self.options)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ArtifactBuilder {
    /// Builder with the standard resolution policy rooted at `options.cwd`.
    pub fn new(engine: Arc<dyn Engine>, options: Arc<BuildOptions>) -> Self {
        let policy = ResolutionPolicy::standard(options.cwd.clone());
        Self {
            engine,
            options,
            policy,
        }
    }

    pub fn options(&self) -> &Arc<BuildOptions> {
        &self.options
    }

    /// Build `entry` once.
    ///
    /// Returns the written artifacts relative to the output directory, with
    /// source maps removed, alongside the raw engine result.
    pub async fn build(&self, entry: &Path) -> (Vec<String>, BuildResult) {
        let request = BuildRequest {
            entry: entry.to_path_buf(),
            options: Arc::clone(&self.options),
            policy: self.policy.clone(),
        };

        let result = self.engine.build(request).await;
        let artifacts = normalize_artifacts(&result.output_files, &self.options.out_dir);
        (artifacts, result)
    }
}

/// Drop source maps and make paths relative to `out_dir` with `/` separators.
///
/// Paths outside `out_dir` are kept whole.
pub fn normalize_artifacts(files: &[OutputFile], out_dir: &Path) -> Vec<String> {
    files
        .iter()
        .filter(|file| !file.is_source_map && file.path.extension().is_none_or(|ext| ext != "map"))
        .map(|file| match file.path.strip_prefix(out_dir) {
            Ok(relative) => relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => file.path.to_string_lossy().into_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingEngine {
        requests: Mutex<Vec<BuildRequest>>,
        outputs: Vec<PathBuf>,
    }

    #[async_trait]
    impl Engine for RecordingEngine {
        async fn build(&self, request: BuildRequest) -> BuildResult {
            self.requests.lock().push(request);
            BuildResult::success(self.outputs.iter().cloned().map(OutputFile::new).collect())
        }
    }

    #[test]
    fn test_normalize_drops_maps_and_strips_prefix() {
        let files = vec![
            OutputFile::new("/p/dist/main.js"),
            OutputFile::new("/p/dist/main.js.map"),
            OutputFile::new("/p/dist/assets/main.css"),
            OutputFile::new("/elsewhere/stray.js"),
        ];
        let artifacts = normalize_artifacts(&files, Path::new("/p/dist"));
        assert_eq!(
            artifacts,
            vec!["main.js", "assets/main.css", "/elsewhere/stray.js"]
        );
    }

    #[tokio::test]
    async fn test_build_invokes_engine_once_with_entry() {
        let engine = Arc::new(RecordingEngine {
            outputs: vec![
                PathBuf::from("/p/dist/app.js"),
                PathBuf::from("/p/dist/app.js.map"),
            ],
            ..Default::default()
        });
        let options = Arc::new(BuildOptions::new("/p", "/p/dist"));
        let builder = ArtifactBuilder::new(engine.clone(), Arc::clone(&options));

        let (artifacts, result) = builder.build(Path::new("/p/src/app.js")).await;

        assert_eq!(artifacts, vec!["app.js"]);
        assert_eq!(result.output_files.len(), 2);

        let requests = engine.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].entry, PathBuf::from("/p/src/app.js"));
        assert!(Arc::ptr_eq(&requests[0].options, &options));
        assert_eq!(requests[0].policy.rules().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_build_yields_no_artifacts() {
        struct Failing;

        #[async_trait]
        impl Engine for Failing {
            async fn build(&self, _request: BuildRequest) -> BuildResult {
                BuildResult::failed(vec![crate::Diagnostic::new("Could not resolve './x'")])
            }
        }

        let builder = ArtifactBuilder::new(
            Arc::new(Failing),
            Arc::new(BuildOptions::new("/p", "/p/dist")),
        );
        let (artifacts, result) = builder.build(Path::new("/p/index.js")).await;
        assert!(artifacts.is_empty());
        assert!(result.has_errors());
    }
}
