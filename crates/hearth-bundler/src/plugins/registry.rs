//! Plugin registry with execution phases.
//!
//! Rolldown runs hooks in registration order, so plugins are tagged with a
//! phase and sorted once before being handed to the bundler.

use crate::SharedPluginable;
use rolldown_plugin::Plugin;
use std::sync::Arc;

/// Plugin execution phases (lower runs first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum PluginPhase {
    /// Module resolution; must see specifiers before the default resolver.
    Resolve = 10,

    /// Source rewriting after load.
    Transform = 20,
}

/// A Rolldown plugin that knows which phase it belongs to.
pub(crate) trait HearthPlugin: Plugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::Transform
    }
}

/// Plugin registry that maintains plugins in phase order
#[derive(Default)]
pub(crate) struct PluginRegistry {
    plugins: Vec<(PluginPhase, SharedPluginable)>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<P: HearthPlugin + 'static>(&mut self, plugin: P) {
        let phase = plugin.phase();
        let plugin_arc: SharedPluginable = Arc::new(plugin);
        self.plugins.push((phase, plugin_arc));
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Convert to Rolldown plugins, sorted by phase.
    ///
    /// The sort is stable, so plugins within a phase keep insertion order.
    pub fn into_rolldown_plugins(mut self) -> Vec<SharedPluginable> {
        self.plugins.sort_by_key(|(phase, _)| *phase);
        self.plugins.into_iter().map(|(_, plugin)| plugin).collect()
    }

    #[cfg(test)]
    fn phases(&self) -> Vec<PluginPhase> {
        let mut phases: Vec<_> = self.plugins.iter().map(|(p, _)| *p).collect();
        phases.sort();
        phases
    }
}
