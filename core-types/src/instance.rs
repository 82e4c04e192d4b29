use serde::{Deserialize, Serialize};

/// Condition under which an instance may run, as a C++ boolean expression
/// over the runtime shape values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Predicate {
    /// Catch-all, matches every shape
    #[default]
    Always,
    When(String),
}

impl Predicate {
    pub fn when(expr: impl Into<String>) -> Self {
        let expr: String = expr.into();
        Predicate::from(Some(expr))
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    /// Expression text placed inside the generated `if (...)`
    pub fn as_cpp(&self) -> &str {
        match self {
            Predicate::Always => "true",
            Predicate::When(expr) => expr,
        }
    }
}

impl From<Option<String>> for Predicate {
    fn from(expr: Option<String>) -> Self {
        match expr {
            None => Predicate::Always,
            Some(e) if e.trim() == "true" => Predicate::Always,
            Some(e) => Predicate::When(e.trim().to_string()),
        }
    }
}

impl From<Predicate> for Option<String> {
    fn from(p: Predicate) -> Self {
        match p {
            Predicate::Always => None,
            Predicate::When(expr) => Some(expr),
        }
    }
}

/// One precompiled kernel specialization.
///
/// `configuration_text` defines the type `config_name`; the generated
/// source then aliases it as `symbol_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelInstance {
    pub symbol_name:        String,
    pub config_name:        String,
    pub configuration_text: String,
    #[serde(default)]
    pub predicate:          Predicate,
}

impl KernelInstance {
    /// Catch-all instance
    pub fn new(
        symbol_name: impl Into<String>,
        config_name: impl Into<String>,
        configuration_text: impl Into<String>,
    ) -> Self {
        Self {
            symbol_name: symbol_name.into(),
            config_name: config_name.into(),
            configuration_text: configuration_text.into(),
            predicate: Predicate::Always,
        }
    }

    pub fn when(mut self, expr: impl Into<String>) -> Self {
        self.predicate = Predicate::when(expr);
        self
    }
}
