use std::collections::HashMap;

use catalog::InstanceCatalog;
use core_types::Predicate;
use fragments::{FragmentError, FragmentKind, FragmentStore, Substitutions};

use crate::types::{Diagnostic, Severity};

/// One guarded entry of a dispatch plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchArm {
    pub symbol:    String,
    pub predicate: Predicate,
}

/// Instances tried top to bottom at runtime; the first arm whose predicate
/// holds is launched and the function returns. Falling off the end reaches
/// the diagnostic failure path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchPlan {
    arms: Vec<DispatchArm>,
}

impl DispatchPlan {
    /// Arms in the catalog's registration order
    pub fn from_catalog(catalog: &InstanceCatalog) -> Self {
        let arms = catalog
            .iter()
            .map(|inst| DispatchArm {
                symbol:    inst.symbol_name.clone(),
                predicate: inst.predicate.clone(),
            })
            .collect();
        Self { arms }
    }

    pub fn arms(&self) -> &[DispatchArm] {
        &self.arms
    }

    /// The arm the generated code launches when `holds` says which
    /// predicates are true; `None` means the no-match failure path.
    pub fn select<F>(&self, mut holds: F) -> Option<&DispatchArm>
    where
        F: FnMut(&Predicate) -> bool,
    {
        self.arms.iter().find(|arm| arm.predicate.is_catch_all() || holds(&arm.predicate))
    }

    /// Advisory findings: unreachable arms and plans that can never succeed
    pub fn diagnostics(&self, function: &str) -> Vec<Diagnostic> {
        let mut out = Vec::new();

        if self.arms.is_empty() {
            out.push(Diagnostic {
                severity: Severity::Warning,
                rule:     "empty-dispatch-plan",
                message:  format!("`{function}` has no instances; every call fails at runtime"),
                symbol:   None,
            });
            return out;
        }

        let catch_all = self.arms.iter().position(|a| a.predicate.is_catch_all());
        if let Some(pos) = catch_all {
            let shadowing = &self.arms[pos].symbol;
            for arm in &self.arms[pos + 1..] {
                out.push(Diagnostic {
                    severity: Severity::Warning,
                    rule:     "unreachable-after-catch-all",
                    message:  format!(
                        "instance `{}` can never run: catch-all `{shadowing}` precedes it",
                        arm.symbol
                    ),
                    symbol:   Some(arm.symbol.clone()),
                });
            }
        } else {
            out.push(Diagnostic {
                severity: Severity::Info,
                rule:     "no-catch-all",
                message:  format!("shapes matching no predicate of `{function}` reach the failure path"),
                symbol:   None,
            });
        }

        // arms past a catch-all are already reported
        let reachable = catch_all.map_or(self.arms.len(), |pos| pos + 1);
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for arm in &self.arms[..reachable] {
            let Predicate::When(expr) = &arm.predicate else { continue };
            match seen.get(expr.as_str()) {
                Some(first) => out.push(Diagnostic {
                    severity: Severity::Warning,
                    rule:     "duplicate-predicate",
                    message:  format!(
                        "instance `{}` can never run: `{first}` has the same predicate `{expr}`",
                        arm.symbol
                    ),
                    symbol:   Some(arm.symbol.clone()),
                }),
                None => {
                    seen.insert(expr.as_str(), arm.symbol.as_str());
                }
            }
        }
        out
    }

    /// Chain of guarded launches, each ending in `return;`
    pub fn render(&self, store: &FragmentStore, problem_args: &str) -> Result<String, FragmentError> {
        let mut blocks = Vec::with_capacity(self.arms.len());
        for arm in &self.arms {
            let program = store.render(
                FragmentKind::InstanceExec,
                &Substitutions::new()
                    .set("instance", arm.symbol.as_str())
                    .set("problem_args", problem_args),
            )?;
            blocks.push(store.render(
                FragmentKind::ExecCond,
                &Substitutions::new()
                    .set("cond", arm.predicate.as_cpp())
                    .set("program", program),
            )?);
        }
        Ok(blocks.join("\n"))
    }
}
