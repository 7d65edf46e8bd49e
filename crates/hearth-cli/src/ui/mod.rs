//! Terminal output helpers.
//!
//! Status lines go to stderr so stdout stays free for the supervised
//! process. Which lines are shown is decided by [`crate::logger::Logger`];
//! the functions here only format.

mod format;
mod messages;

pub use format::{format_duration, format_size, print_build_summary};
pub use messages::{error, info, success, warning};

/// Check if color output should be enabled.
///
/// `NO_COLOR` disables and `FORCE_COLOR` enables colors; otherwise colors
/// are used when stderr is a terminal.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    console::user_attended_stderr()
}

/// Apply `--no-color` to every colored line the CLI prints.
///
/// Without the flag, owo-colors decides per stream from the terminal and
/// the `NO_COLOR`/`FORCE_COLOR` variables.
pub fn init_colors(no_color: bool) {
    if no_color {
        owo_colors::set_override(false);
    }
}
