//! Diagnostic extraction from Rolldown errors.
//!
//! Rolldown's error types are not a stable API, so every failure crossing the
//! engine boundary is flattened into [`Diagnostic`]: a message plus an
//! optional source location. Consumers (the live-reload notifier, the
//! supervisor, the CLI) only ever see this shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a diagnostic originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// A build error reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Human readable message
    pub text: String,
    /// Originating source location, when the engine reported one
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Create a diagnostic without location information.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }

    /// Attach a file location.
    pub fn at(mut self, file: impl Into<String>, line: Option<u32>, column: Option<u32>) -> Self {
        self.location = Some(Location {
            file: file.into(),
            line,
            column,
        });
        self
    }

    /// File the diagnostic points at, or an empty string.
    pub fn file(&self) -> &str {
        self.location.as_ref().map(|l| l.file.as_str()).unwrap_or("")
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)?;
        if let Some(location) = &self.location {
            write!(f, " @ {}", location.file)?;
            if let Some(line) = location.line {
                write!(f, ":{line}")?;
                if let Some(column) = location.column {
                    write!(f, ":{column}")?;
                }
            }
        }
        Ok(())
    }
}

/// Extract diagnostics from Rolldown error types.
///
/// Rolldown reports failures as a batch. We work from the `Debug` rendering,
/// splitting it per `BuildDiagnostic` and pulling the message and location
/// out of each part.
pub fn extract_from_rolldown_error(error: &dyn fmt::Debug) -> Vec<Diagnostic> {
    extract_from_debug_output(&format!("{error:?}"))
}

fn extract_from_debug_output(error_str: &str) -> Vec<Diagnostic> {
    let parts: Vec<&str> = error_str
        .split("BuildDiagnostic")
        .map(str::trim)
        .filter(|part| part.chars().any(char::is_alphanumeric) && *part != "Batched")
        .collect();

    if parts.len() > 1 {
        parts.into_iter().map(extract_single).collect()
    } else {
        vec![extract_single(error_str)]
    }
}

fn extract_single(text: &str) -> Diagnostic {
    let message = extract_message(text).unwrap_or_else(|| first_line(text));
    let diagnostic = Diagnostic::new(message);

    match extract_file_path(text) {
        Some(file) => {
            let line = extract_line_number(text);
            let column = line.and_then(|_| extract_column_number(text));
            diagnostic.at(file, line, column)
        }
        None => diagnostic,
    }
}

/// Pull the quoted value out of a `message: "..."` field.
fn extract_message(text: &str) -> Option<String> {
    let start = text.find("message: \"")? + "message: \"".len();
    let rest = &text[start..];

    let mut out = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => break,
            },
            '"' => return Some(out),
            other => out.push(other),
        }
    }
    None
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(text)
        .to_string()
}

/// Extract a source file path from error text.
fn extract_file_path(text: &str) -> Option<String> {
    for ext in [".tsx", ".jsx", ".mjs", ".cjs", ".ts", ".js", ".css"] {
        let Some(pos) = text.find(ext) else {
            continue;
        };
        let before = &text[..pos + ext.len()];
        let start = before
            .rfind(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '(' | '`'))
            .map(|i| i + 1)
            .unwrap_or(0);
        let candidate = &before[start..];
        if !candidate.is_empty() && candidate != ext {
            return Some(candidate.to_string());
        }
    }
    None
}

/// Extract the line number from a `file:line:col` suffix or a `line N` phrase.
fn extract_line_number(text: &str) -> Option<u32> {
    if let Some(pos) = text.find("line ") {
        let digits: String = text[pos + 5..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if let Ok(n) = digits.parse() {
            return Some(n);
        }
    }
    location_suffix(text).map(|(line, _)| line)
}

fn extract_column_number(text: &str) -> Option<u32> {
    if let Some(pos) = text.find("column ") {
        let digits: String = text[pos + 7..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if let Ok(n) = digits.parse() {
            return Some(n);
        }
    }
    location_suffix(text).and_then(|(_, col)| col)
}

/// Find the first `:<line>` or `:<line>:<col>` that follows a file extension.
fn location_suffix(text: &str) -> Option<(u32, Option<u32>)> {
    for (idx, _) in text.match_indices(':') {
        let after = &text[idx + 1..];
        let line: String = after.chars().take_while(char::is_ascii_digit).collect();
        if line.is_empty() {
            continue;
        }
        let Ok(line_no) = line.parse() else {
            continue;
        };
        let rest = &after[line.len()..];
        let column = rest.strip_prefix(':').and_then(|r| {
            let col: String = r.chars().take_while(char::is_ascii_digit).collect();
            col.parse().ok()
        });
        return Some((line_no, column));
    }
    None
}
