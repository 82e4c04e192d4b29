use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use core_types::{KernelInstance, OperationDescriptor};
use gemm_synth::PlannedShapes;
use serde::{Deserialize, Serialize};

/// Everything needed to generate one function, as read from a YAML file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub descriptor: OperationDescriptor,
    /// Dispatch order is list order
    #[serde(default)]
    pub instances:  Vec<KernelInstance>,
    #[serde(default)]
    pub shapes:     PlannedShapes,
}

impl GenerationRequest {
    pub fn new(descriptor: OperationDescriptor) -> Self {
        Self { descriptor, instances: Vec::new(), shapes: PlannedShapes::default() }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("invalid generation request")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("in {}", path.display()))
    }

    pub fn function_name(&self) -> &str {
        &self.descriptor.function_name
    }
}
