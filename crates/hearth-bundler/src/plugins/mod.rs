//! Rolldown plugins installed by the engine.
//!
//! - [`ResolutionPolicyPlugin`] runs the resolution policy in `resolve_id`
//! - [`DefinePlugin`] substitutes define-map keys in `transform`

mod define;
mod registry;
mod resolution;

pub use define::DefinePlugin;
pub(crate) use registry::{HearthPlugin, PluginPhase, PluginRegistry};
pub use resolution::ResolutionPolicyPlugin;
