//! Compile-time constant substitution (`process.env.NODE_ENV` and friends).

use super::HearthPlugin;
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage, Plugin,
    SharedTransformPluginContext,
};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Replaces define-map keys with their values in script modules.
///
/// Matching is textual with identifier boundaries on both sides, so
/// `process.env.NODE_ENV` is replaced but `process.env.NODE_ENV_EXTRA` and
/// `myprocess.env.NODE_ENV` are not. Longer keys are applied first.
#[derive(Debug, Clone)]
pub struct DefinePlugin {
    replacements: Arc<Vec<(String, String)>>,
}

impl DefinePlugin {
    pub fn new(define: &BTreeMap<String, String>) -> Self {
        let mut replacements: Vec<(String, String)> = define
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            replacements: Arc::new(replacements),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

impl Plugin for DefinePlugin {
    fn name(&self) -> Cow<'static, str> {
        "hearth:define".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let is_script = matches!(
            args.module_type,
            ModuleType::Js | ModuleType::Jsx | ModuleType::Ts | ModuleType::Tsx
        );
        let code = args.code.to_string();
        let replacements = Arc::clone(&self.replacements);

        async move {
            if !is_script {
                return Ok(None);
            }

            Ok(apply_defines(&code, &replacements).map(|code| HookTransformOutput {
                code: Some(code),
                map: None,
                side_effects: None,
                module_type: None,
            }))
        }
    }
}

impl HearthPlugin for DefinePlugin {}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Apply every replacement; `None` when the code is unchanged.
pub(crate) fn apply_defines(code: &str, replacements: &[(String, String)]) -> Option<String> {
    let mut current = Cow::Borrowed(code);
    let mut changed = false;

    for (key, value) in replacements {
        if !current.contains(key.as_str()) {
            continue;
        }

        let mut out = String::with_capacity(current.len());
        let mut last = 0;
        for (idx, _) in current.match_indices(key.as_str()) {
            if idx < last {
                continue;
            }
            let before = current[..idx].chars().next_back();
            let after = current[idx + key.len()..].chars().next();
            let bounded_left = before.is_none_or(|c| !is_ident_char(c) && c != '.');
            let bounded_right = after.is_none_or(|c| !is_ident_char(c));
            if bounded_left && bounded_right {
                out.push_str(&current[last..idx]);
                out.push_str(value);
                last = idx + key.len();
                changed = true;
            }
        }
        out.push_str(&current[last..]);
        current = Cow::Owned(out);
    }

    changed.then(|| current.into_owned())
}
