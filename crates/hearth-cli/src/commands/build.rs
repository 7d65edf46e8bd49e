//! One-shot builds.
//!
//! Build diagnostics are logged, not returned as errors: a one-shot build
//! with errors still exits 0 and hands the result back to the caller.

use hearth_bundler::{ArtifactBuilder, BuildResult};
use std::time::Instant;

use crate::cli::LogLevel;
use crate::commands::ensure_entry;
use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::html::{CopyReport, render_index};
use crate::logger::Logger;
use crate::ui;

/// What a one-shot module build produced.
#[derive(Debug, Clone)]
pub struct EntryBuild {
    /// Artifacts relative to the output directory, without source maps.
    pub artifacts: Vec<String>,
    pub result: BuildResult,
}

/// Bundle the entry module once.
pub async fn build_entry(
    config: &OrchestratorConfig,
    builder: &ArtifactBuilder,
    logger: Logger,
) -> Result<EntryBuild> {
    ensure_entry(&config.entry)?;

    let start = Instant::now();
    let (artifacts, result) = builder.build(&config.entry).await;
    let elapsed = start.elapsed();

    for diagnostic in &result.errors {
        logger.error(&diagnostic.to_string());
    }

    if result.has_errors() {
        logger.warn(&format!(
            "Build of {} finished with {} error(s)",
            config.entry.display(),
            result.errors.len()
        ));
    } else {
        logger.success(&format!(
            "Built {} in {}",
            config.entry.display(),
            ui::format_duration(elapsed)
        ));
        if logger.enabled(LogLevel::Info) {
            let sizes: Vec<(String, u64)> = artifacts
                .iter()
                .map(|artifact| {
                    let size = std::fs::metadata(config.out_dir().join(artifact))
                        .map(|m| m.len())
                        .unwrap_or(0);
                    (artifact.clone(), size)
                })
                .collect();
            ui::print_build_summary(&sizes, elapsed);
        }
    }

    Ok(EntryBuild { artifacts, result })
}

/// Render the HTML entry once and wait for its asset copies.
pub async fn build_index(
    config: &OrchestratorConfig,
    builder: &ArtifactBuilder,
    logger: Logger,
) -> Result<CopyReport> {
    let start = Instant::now();
    let output = render_index(config, builder, logger).await?;
    let report = output.copies.join().await;

    if !report.is_clean() {
        logger.warn(&format!("{} asset(s) could not be copied", report.failed.len()));
    }
    logger.success(&format!(
        "Built {} in {}",
        output.index_path.display(),
        ui::format_duration(start.elapsed())
    ));

    Ok(report)
}
