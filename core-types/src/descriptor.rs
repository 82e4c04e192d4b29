use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ElementType, is_c_identifier};

/// Errors found while validating an [`OperationDescriptor`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("invalid ranks for `{function}` (input_rank={input_rank}, weight_rank={weight_rank}): {reason}")]
    RankMismatch {
        function: String,
        input_rank: i64,
        weight_rank: i64,
        reason: String,
    },

    #[error("`{name}` is not a valid C identifier")]
    InvalidIdentifier { name: String },
}

/// One gemm+bias operation to generate a function for.
///
/// The output operand always has `input_rank` dimensions: the bias is
/// broadcast over the input's leading dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct OperationDescriptor {
    pub function_name:    String,
    pub input_rank:       usize,
    pub weight_rank:      usize,
    pub supports_split_k: bool,
    pub element_type:     ElementType,
}

/// Descriptor as written in a request file, before rank validation
#[derive(Debug, Clone, Deserialize)]
pub struct RawDescriptor {
    pub function_name: String,
    pub input_rank:    i64,
    pub weight_rank:   i64,
    #[serde(default)]
    pub supports_split_k: bool,
    #[serde(default)]
    pub element_type: ElementType,
}

impl OperationDescriptor {
    pub fn new(function_name: impl Into<String>, input_rank: usize, weight_rank: usize) -> Self {
        Self {
            function_name: function_name.into(),
            input_rank,
            weight_rank,
            supports_split_k: false,
            element_type: ElementType::default(),
        }
    }

    pub fn with_split_k(mut self, supports_split_k: bool) -> Self {
        self.supports_split_k = supports_split_k;
        self
    }

    pub fn with_element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    /// Rank of the output operand (mirrors the input)
    pub fn output_rank(&self) -> usize {
        self.input_rank
    }

    /// Check the name and both ranks
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if !is_c_identifier(&self.function_name) {
            return Err(DescriptorError::InvalidIdentifier { name: self.function_name.clone() });
        }
        check_ranks(&self.function_name, self.input_rank as i64, self.weight_rank as i64)
    }
}

fn check_ranks(function: &str, input_rank: i64, weight_rank: i64) -> Result<(), DescriptorError> {
    let reason = if input_rank < 0 || weight_rank < 0 {
        "ranks must be non-negative"
    } else if input_rank == 0 || weight_rank == 0 {
        "every operand needs at least one dimension"
    } else {
        return Ok(());
    };
    Err(DescriptorError::RankMismatch {
        function: function.to_string(),
        input_rank,
        weight_rank,
        reason: reason.to_string(),
    })
}

impl TryFrom<RawDescriptor> for OperationDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        check_ranks(&raw.function_name, raw.input_rank, raw.weight_rank)?;
        let desc = OperationDescriptor {
            function_name:    raw.function_name,
            input_rank:       raw.input_rank as usize,
            weight_rank:      raw.weight_rank as usize,
            supports_split_k: raw.supports_split_k,
            element_type:     raw.element_type,
        };
        desc.validate()?;
        Ok(desc)
    }
}
