use std::fmt;

use catalog::CatalogError;
use core_types::DescriptorError;
use fragments::FragmentError;
use thiserror::Error;

/// Errors that abort a generation request. No artifact is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Fragment(#[from] FragmentError),

    #[error("calling convention of `{function}` violated: {detail}")]
    ContractViolation { function: String, detail: String },

    #[error("instance symbol `{symbol}` collides with {clashes_with} in `{function}`")]
    ReservedSymbol { function: String, symbol: String, clashes_with: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Info,
}

/// Advisory finding about a dispatch plan; never fatal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub rule:     &'static str,
    pub message:  String,
    /// Instance the finding is about, if any
    pub symbol:   Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        write!(f, "[{prefix}] {}: {}", self.rule, self.message)
    }
}

/// Declaration + definition for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub function_name: String,
    pub declaration:   String,
    pub definition:    String,
    pub diagnostics:   Vec<Diagnostic>,
}

impl GeneratedArtifact {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }
}
