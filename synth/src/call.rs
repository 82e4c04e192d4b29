use serde::{Deserialize, Serialize};

/// Expressions passed to the generated function at a call site.
///
/// Pointer and dimension fields hold caller-side C++ expressions, e.g.
/// `&input_dim_0` or `reinterpret_cast<cutlass::half_t*>(a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    pub input:     String,
    pub weight:    String,
    pub bias:      String,
    pub output:    String,
    #[serde(default = "CallSite::default_workspace")]
    pub workspace: String,
    /// Must be set exactly when the descriptor supports split-k
    #[serde(default)]
    pub split_k:   Option<String>,
    pub input_dims:  Vec<String>,
    pub weight_dims: Vec<String>,
    pub output_dims: Vec<String>,
    #[serde(default = "CallSite::default_stream")]
    pub stream:    String,
    /// Leading spaces of every emitted line
    #[serde(default)]
    pub indent:    usize,
}

impl CallSite {
    fn default_workspace() -> String {
        "global_workspace_".to_string()
    }

    fn default_stream() -> String {
        "stream".to_string()
    }

    /// Call site with the default workspace/stream names and no split-k
    pub fn new(
        input: impl Into<String>,
        weight: impl Into<String>,
        bias: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            input:       input.into(),
            weight:      weight.into(),
            bias:        bias.into(),
            output:      output.into(),
            workspace:   Self::default_workspace(),
            split_k:     None,
            input_dims:  Vec::new(),
            weight_dims: Vec::new(),
            output_dims: Vec::new(),
            stream:      Self::default_stream(),
            indent:      0,
        }
    }

    pub fn with_dims<S: Into<String>>(
        mut self,
        input_dims: impl IntoIterator<Item = S>,
        weight_dims: impl IntoIterator<Item = S>,
        output_dims: impl IntoIterator<Item = S>,
    ) -> Self {
        self.input_dims = input_dims.into_iter().map(Into::into).collect();
        self.weight_dims = weight_dims.into_iter().map(Into::into).collect();
        self.output_dims = output_dims.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_split_k(mut self, split_k: impl Into<String>) -> Self {
        self.split_k = Some(split_k.into());
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}
