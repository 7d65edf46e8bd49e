use std::path::PathBuf;

use crate::cli::{Format, LogLevel, Platform};

/// Config file looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "hearth.config.json";

/// Prefix of environment overrides, e.g. `HEARTH_PORT`.
pub const ENV_PREFIX: &str = "HEARTH_";

/// Define key set from the run mode unless the user provides one.
pub const NODE_ENV_KEY: &str = "process.env.NODE_ENV";

pub fn default_entry() -> PathBuf {
    PathBuf::from("public/index.html")
}

pub fn default_host() -> String {
    "localhost".to_string()
}

pub fn default_port() -> u16 {
    1234
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_format() -> Format {
    Format::Esm
}

pub fn default_platform() -> Platform {
    Platform::Browser
}

pub fn default_log_level() -> LogLevel {
    LogLevel::Warning
}

/// `NODE_ENV` literal for the run mode.
pub fn node_env_value(serve: bool) -> &'static str {
    if serve {
        "\"development\""
    } else {
        "\"production\""
    }
}
