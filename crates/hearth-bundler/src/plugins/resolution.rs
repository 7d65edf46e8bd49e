//! Rolldown adapter for the resolution policy.

use super::{HearthPlugin, PluginPhase};
use crate::resolve::{Resolution, ResolutionPolicy};
use anyhow::Context;
use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use std::borrow::Cow;
use std::path::Path;

/// Runs a [`ResolutionPolicy`] in Rolldown's `resolve_id` hook.
///
/// - `Resolved` claims the module with the resolved absolute path
/// - `Defer` returns `Ok(None)` so Rolldown's resolver takes over
/// - errors become build diagnostics attached to the importer
#[derive(Debug, Clone)]
pub struct ResolutionPolicyPlugin {
    policy: ResolutionPolicy,
}

impl ResolutionPolicyPlugin {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }
}

impl Plugin for ResolutionPolicyPlugin {
    fn name(&self) -> Cow<'static, str> {
        "hearth:resolution-policy".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let importer = args.importer.map(|s| s.to_string());
        let policy = self.policy.clone();

        async move {
            // Virtual modules (rolldown runtime, other plugins) are not ours.
            if specifier.starts_with('\0') || importer.as_deref().is_some_and(|i| i.starts_with('\0')) {
                return Ok(None);
            }

            let importer_dir = importer
                .as_deref()
                .and_then(|i| Path::new(i).parent());

            let resolution = policy.resolve(&specifier, importer_dir).with_context(|| {
                format!(
                    "failed to resolve '{}' from '{}'",
                    specifier,
                    importer.as_deref().unwrap_or("<entry>")
                )
            })?;

            match resolution {
                Resolution::Resolved(path) => Ok(Some(HookResolveIdOutput {
                    id: path.to_string_lossy().into_owned().into(),
                    external: Some(ResolvedExternal::Bool(false)),
                    ..Default::default()
                })),
                Resolution::Defer => Ok(None),
            }
        }
    }
}

impl HearthPlugin for ResolutionPolicyPlugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::Resolve
    }
}
