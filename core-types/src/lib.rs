mod descriptor;
mod instance;

use serde::{Deserialize, Serialize};

include!("generated_element_types.rs");

pub use descriptor::{DescriptorError, OperationDescriptor, RawDescriptor};
pub use instance::{KernelInstance, Predicate};

/// True if `s` can be used verbatim as a C/C++ identifier.
pub fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
