pub mod types;

use std::collections::HashMap;

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use tracing::debug;

pub use types::{FragmentError, FragmentKind, Substitutions};

/// Names the template engine provides on its own; never reported as
/// unresolved placeholders.
const ENGINE_NAMES: &[&str] = &["range", "loop", "dict", "namespace", "debug"];

/// Immutable store of compiled text fragments.
///
/// Built once, then shared read-only (for instance behind an `Arc`) by
/// every generation request.
pub struct FragmentStore {
    env: Environment<'static>,
}

impl FragmentStore {
    /* ------------------------------------------------------------------ */
    /* Construction                                                       */
    /* ------------------------------------------------------------------ */

    /// Compile the built-in fragments.
    pub fn new() -> Result<Self, FragmentError> {
        Self::from_sources(std::iter::empty())
    }

    /// Compile the built-in fragments, replacing the given kinds with
    /// caller-supplied sources.
    pub fn from_sources<I>(overrides: I) -> Result<Self, FragmentError>
    where
        I: IntoIterator<Item = (FragmentKind, &'static str)>,
    {
        let mut sources: HashMap<FragmentKind, &'static str> = FragmentKind::ALL
            .iter()
            .map(|&kind| (kind, kind.builtin_source()))
            .collect();
        for (kind, src) in overrides {
            debug!(fragment = kind.name(), "overriding built-in fragment");
            sources.insert(kind, src);
        }

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        for kind in FragmentKind::ALL {
            env.add_template(kind.name(), sources[&kind])
                .map_err(|e| FragmentError::MalformedTemplate {
                    fragment: kind,
                    reason: e.to_string(),
                })?;
        }
        Ok(Self { env })
    }

    /* ------------------------------------------------------------------ */
    /* Rendering                                                          */
    /* ------------------------------------------------------------------ */

    /// Resolve every placeholder of `kind` from `subs`.
    pub fn render(&self, kind: FragmentKind, subs: &Substitutions) -> Result<String, FragmentError> {
        if let Some(slot) = kind.required_slots().iter().find(|s| !subs.contains(s)) {
            return Err(FragmentError::UnresolvedPlaceholder {
                fragment: kind,
                slot: slot.to_string(),
            });
        }

        let tmpl = self.env.get_template(kind.name())
            .map_err(|e| FragmentError::Render { fragment: kind, reason: e.to_string() })?;

        let out = tmpl.render(subs.to_context()).map_err(|e| match e.kind() {
            ErrorKind::UndefinedError => {
                // the engine does not name the variable; recover it from the template
                let mut missing: Vec<String> = tmpl
                    .undeclared_variables(false)
                    .into_iter()
                    .filter(|v| !subs.contains(v) && !ENGINE_NAMES.contains(&v.as_str()))
                    .collect();
                missing.sort();
                FragmentError::UnresolvedPlaceholder {
                    fragment: kind,
                    slot: missing.into_iter().next().unwrap_or_else(|| "<unknown>".to_string()),
                }
            }
            ErrorKind::SyntaxError => FragmentError::MalformedTemplate {
                fragment: kind,
                reason: e.to_string(),
            },
            _ => FragmentError::Render { fragment: kind, reason: e.to_string() },
        })?;

        debug!(fragment = kind.name(), bytes = out.len(), "rendered fragment");
        Ok(out)
    }
}
