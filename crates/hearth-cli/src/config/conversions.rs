use hearth_bundler::{BuildOptions, OutputFormat, SourceMap};
use path_clean::PathClean;
use std::path::Path;
use std::sync::Arc;

use crate::cli::{Format, Platform, SourceMapMode};
use crate::config::{HearthConfig, Manifest, NODE_ENV_KEY, OrchestratorConfig, node_env_value};
use crate::error::Result;

// CLI enums -> bundler enums

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Esm => OutputFormat::Esm,
            Format::Cjs => OutputFormat::Cjs,
            Format::Iife => OutputFormat::Iife,
        }
    }
}

impl From<Platform> for hearth_bundler::Platform {
    fn from(p: Platform) -> Self {
        match p {
            Platform::Browser => hearth_bundler::Platform::Browser,
            Platform::Node => hearth_bundler::Platform::Node,
            Platform::Neutral => hearth_bundler::Platform::Neutral,
        }
    }
}

impl From<SourceMapMode> for SourceMap {
    fn from(s: SourceMapMode) -> Self {
        match s {
            SourceMapMode::Inline => SourceMap::Inline,
            SourceMapMode::External => SourceMap::External,
            SourceMapMode::Hidden => SourceMap::Hidden,
        }
    }
}

impl HearthConfig {
    /// Resolve paths against `cwd` and fold in `package.json`.
    ///
    /// Validates first. With platform `node` every manifest dependency
    /// becomes external, and `process.env.NODE_ENV` is defined from the run
    /// mode unless the user already set it.
    pub fn into_orchestrator(
        self,
        cwd: &Path,
        manifest: Option<Manifest>,
    ) -> Result<OrchestratorConfig> {
        self.validate()?;

        let cwd = cwd.clean();
        let mut options = BuildOptions::new(cwd.clone(), cwd.join(&self.out_dir).clean())
            .format(self.format.into())
            .platform(self.platform.into())
            .external(self.external)
            .sourcemap(self.sourcemap.map(Into::into))
            .minify(self.minify);

        if self.platform == Platform::Node {
            if let Some(manifest) = &manifest {
                options = options.external(manifest.dependency_names());
            }
        }

        for (key, value) in self.define {
            options = options.define(key, value);
        }
        if !options.define.contains_key(NODE_ENV_KEY) {
            options = options.define(NODE_ENV_KEY, node_env_value(self.serve));
        }

        Ok(OrchestratorConfig {
            entry: cwd.join(&self.entry).clean(),
            host: self.host,
            port: self.port,
            serve: self.serve,
            secure: self.secure,
            build: Arc::new(options),
            log_level: self.log_level,
            manifest,
        })
    }
}
