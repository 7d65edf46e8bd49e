use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output format for bundled code
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// ECMAScript modules (import/export syntax)
    ///
    /// Rendered into HTML as `<script type="module">` tags.
    #[value(name = "esm")]
    Esm,

    /// CommonJS modules (require/module.exports)
    #[value(name = "cjs")]
    Cjs,

    /// Immediately Invoked Function Expression
    ///
    /// Wraps code in a function that executes immediately. Suitable for
    /// classic browser script tags.
    #[value(name = "iife")]
    Iife,
}

/// Source map generation mode
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    /// Inline source maps embedded in the bundle
    #[value(name = "inline")]
    Inline,

    /// External source map files (.map)
    ///
    /// Map files are written next to the bundles but never reported as
    /// artifacts.
    #[value(name = "external")]
    External,

    /// Generate source maps but don't reference them
    #[value(name = "hidden")]
    Hidden,
}

/// Target platform environment
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Browser environment
    #[value(name = "browser")]
    Browser,

    /// Node.js environment
    ///
    /// Every dependency listed in package.json is left external.
    #[value(name = "node")]
    Node,

    /// No platform assumptions
    #[value(name = "neutral")]
    Neutral,
}

/// Verbosity of operator-facing output.
///
/// Ordered from most to least chatty; a message is shown when its severity
/// is at or above the configured level.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[value(name = "verbose")]
    Verbose,
    #[value(name = "debug")]
    Debug,
    #[value(name = "info")]
    Info,
    #[default]
    #[value(name = "warning")]
    Warning,
    #[value(name = "error")]
    Error,
    /// Nothing at all, not even the ready banner
    #[value(name = "silent")]
    Silent,
}
