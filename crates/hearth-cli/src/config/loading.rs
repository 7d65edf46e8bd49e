use crate::cli::Cli;
use crate::config::{CONFIG_FILE_NAME, ENV_PREFIX, HearthConfig, PartialConfig};
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use std::path::{Path, PathBuf};

impl HearthConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    ///
    /// `cwd` is where `hearth.config.json` is looked up; an explicit
    /// `--config` path must exist.
    pub fn load(cli: &Cli, cwd: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = config_file(cli.config.as_deref(), cwd)? {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(Serialized::defaults(Self::env_layer()?));
        figment = figment.merge(Serialized::defaults(Self::cli_layer(cli)));

        figment.extract().map_err(|e| {
            ConfigError::InvalidValue {
                field: field_name(&e.path),
                value: e.kind.to_string(),
                hint: "Check hearth.config.json and HEARTH_* variables for field names and types"
                    .to_string(),
            }
            .into()
        })
    }

    /// Values set through `HEARTH_*` environment variables.
    fn env_layer() -> Result<PartialConfig> {
        Figment::from(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| {
                ConfigError::InvalidValue {
                    field: format!("{}{}", ENV_PREFIX, e.path.join("_").to_uppercase()),
                    value: e.kind.to_string(),
                    hint: "Unset the variable or give it a value of the right type".to_string(),
                }
                .into()
            })
    }

    /// Values the user actually passed on the command line.
    pub(crate) fn cli_layer(cli: &Cli) -> PartialConfig {
        PartialConfig {
            entry: cli.entry.clone(),
            host: cli.host.clone(),
            port: cli.port,
            serve: cli.serve.then_some(true),
            secure: cli.secure.then_some(true),
            out_dir: cli.outdir.clone(),
            format: cli.format,
            platform: cli.platform,
            external: (!cli.external.is_empty()).then(|| cli.external.clone()),
            define: (!cli.define.is_empty()).then(|| cli.define.iter().cloned().collect()),
            sourcemap: cli.sourcemap,
            minify: cli.minify.then_some(true),
            log_level: cli.requested_log_level(),
        }
    }
}

fn config_file(explicit: Option<&Path>, cwd: &Path) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        let path = cwd.join(path);
        if !path.is_file() {
            return Err(ConfigError::NotFound(path).into());
        }
        return Ok(Some(path));
    }

    let default_path = cwd.join(CONFIG_FILE_NAME);
    Ok(default_path.is_file().then_some(default_path))
}

fn field_name(path: &[String]) -> String {
    if path.is_empty() {
        "configuration".to_string()
    } else {
        path.join(".")
    }
}
