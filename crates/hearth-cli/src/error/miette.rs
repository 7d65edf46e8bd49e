//! Miette report conversion for CLI errors.

use crate::error::{CliError, SupervisorError};
use miette::Report;

/// Convert a [`CliError`] into a miette report for the final exit message.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => miette::miette!(code = "hearth::config", "{}", e),
        CliError::Build(e) => miette::miette!(code = "hearth::build", "{}", e),
        CliError::Supervisor(e) => supervisor_error_to_miette(e),
        CliError::Template(e) => {
            let detail = e.display_debug_info().to_string();
            miette::miette!(
                code = "hearth::template",
                help = "Template functions: livereload(), build(path, with_tag), copy(path)",
                "{}{}",
                e,
                if detail.is_empty() { String::new() } else { format!("\n{detail}") }
            )
        }
        other => miette::miette!("{}", other),
    }
}

fn supervisor_error_to_miette(err: SupervisorError) -> Report {
    let help = match &err {
        SupervisorError::Signal { .. } => "The previous process may still be running",
        SupervisorError::Spawn { .. } => "Make sure `node` is installed and on PATH",
    };
    miette::miette!(code = "hearth::supervisor", help = help, "{}", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_config_error_report() {
        let report = cli_error_to_miette(CliError::Config(ConfigError::MissingField {
            field: "entry".into(),
            hint: "Pass an entry".into(),
        }));
        assert!(report.to_string().contains("Missing required field: entry"));
        assert_eq!(
            report.code().map(|c| c.to_string()),
            Some("hearth::config".to_string())
        );
    }

    #[test]
    fn test_custom_error_report() {
        let report = cli_error_to_miette(CliError::Custom("plain failure".into()));
        assert_eq!(report.to_string(), "plain failure");
    }
}
