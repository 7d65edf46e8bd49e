//! Formatting utilities for sizes, durations, and build summaries.

use console::Term;
use owo_colors::{OwoColorize, Stream::Stderr};
use std::time::Duration;

/// Format file size in human-readable format.
///
/// ```
/// use hearth_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use hearth_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print the artifacts of a one-shot build with their sizes.
pub fn print_build_summary(entries: &[(String, u64)], elapsed: Duration) {
    let width = (Term::stderr().size().1 as usize).min(80);

    eprintln!("{}", "─".repeat(width));
    for (name, size) in entries {
        eprintln!(
            "  {} {} {}",
            "▸".if_supports_color(Stderr, |t| t.blue()),
            name.if_supports_color(Stderr, |t| t.bold()),
            format_size(*size).if_supports_color(Stderr, |t| t.dimmed())
        );
    }
    eprintln!("{}", "─".repeat(width));

    let total: u64 = entries.iter().map(|(_, size)| size).sum();
    eprintln!(
        "  {} {} in {}",
        "Total:".if_supports_color(Stderr, |t| t.bold()),
        format_size(total).if_supports_color(Stderr, |t| t.green()),
        format_duration(elapsed).if_supports_color(Stderr, |t| t.green())
    );
}
