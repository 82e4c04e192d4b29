use std::collections::BTreeMap;
use std::fmt;

use minijinja::Value;
use thiserror::Error;

/// The text fragments a generated gemm+bias source is assembled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// `using <symbol> = <config type>;` after the instance's config block
    InstanceAlias,
    /// Parameter types only, no body
    FunctionDeclaration,
    /// Whole translation unit: headers, instances and the dispatching function
    FunctionDefinition,
    /// One predicate-guarded dispatch arm
    ExecCond,
    /// Launch of one instance inside a dispatch arm
    InstanceExec,
    /// Call site of the generated function
    FunctionCall,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 6] = [
        FragmentKind::InstanceAlias,
        FragmentKind::FunctionDeclaration,
        FragmentKind::FunctionDefinition,
        FragmentKind::ExecCond,
        FragmentKind::InstanceExec,
        FragmentKind::FunctionCall,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FragmentKind::InstanceAlias       => "instance_alias",
            FragmentKind::FunctionDeclaration => "function_declaration",
            FragmentKind::FunctionDefinition  => "function_definition",
            FragmentKind::ExecCond            => "exec_cond",
            FragmentKind::InstanceExec        => "instance_exec",
            FragmentKind::FunctionCall        => "function_call",
        }
    }

    /// Substitution keys that must be present before rendering
    pub fn required_slots(self) -> &'static [&'static str] {
        match self {
            FragmentKind::InstanceAlias => &["config", "name", "config_name"],
            FragmentKind::FunctionDeclaration => &[
                "function_name", "elem_type", "support_split_k", "input_ndims", "weight_ndims",
            ],
            FragmentKind::FunctionDefinition => &[
                "function_name",
                "elem_type",
                "support_split_k",
                "input_ndims",
                "weight_ndims",
                "extra_code",
                "instances",
                "shape_eval",
                "input_addr_calculator",
                "output_addr_calculator",
                "extra_shape",
                "input_output_checks",
                "exec_paths",
            ],
            FragmentKind::ExecCond => &["cond", "program"],
            FragmentKind::InstanceExec => &["instance", "problem_args"],
            FragmentKind::FunctionCall => &["indent", "function_name", "args"],
        }
    }

    pub(crate) fn builtin_source(self) -> &'static str {
        match self {
            FragmentKind::InstanceAlias       => include_str!("../templates/instance_alias.jinja"),
            FragmentKind::FunctionDeclaration => include_str!("../templates/function_declaration.jinja"),
            FragmentKind::FunctionDefinition  => include_str!("../templates/function_definition.jinja"),
            FragmentKind::ExecCond            => include_str!("../templates/exec_cond.jinja"),
            FragmentKind::InstanceExec        => include_str!("../templates/instance_exec.jinja"),
            FragmentKind::FunctionCall        => include_str!("../templates/function_call.jinja"),
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named values substituted into a fragment
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    values: BTreeMap<&'static str, Value>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn set(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &'static str, value: impl Into<Value>) {
        self.values.insert(key, value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub(crate) fn to_context(&self) -> Value {
        Value::from_serialize(&self.values)
    }
}

/// Errors while building the store or resolving a fragment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FragmentError {
    #[error("fragment `{fragment}`: placeholder `{slot}` has no substitution")]
    UnresolvedPlaceholder { fragment: FragmentKind, slot: String },

    #[error("fragment `{fragment}` is malformed: {reason}")]
    MalformedTemplate { fragment: FragmentKind, reason: String },

    #[error("fragment `{fragment}` failed to render: {reason}")]
    Render { fragment: FragmentKind, reason: String },
}
