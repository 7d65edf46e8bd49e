use crate::config::HearthConfig;
use crate::error::{ConfigError, Result};

impl HearthConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.entry.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "entry".to_string(),
                hint: "Pass an entry module or HTML document".to_string(),
            }
            .into());
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: "0".to_string(),
                hint: "Use a port between 1 and 65535".to_string(),
            }
            .into());
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "host".to_string(),
                value: self.host.clone(),
                hint: "Use a hostname or IP address such as localhost".to_string(),
            }
            .into());
        }

        if self.out_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "outDir".to_string(),
                hint: "Pass --outdir or remove the empty value".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
