//! Dispatch-function generator for fused gemm+bias operations.
//!
//! Given an operation descriptor and an ordered list of precompiled kernel
//! instances, generates a C++ declaration and a definition that picks the
//! first instance whose shape predicate holds at runtime and fails loudly
//! when none does.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub use catalog::{CatalogError, InstanceCatalog};
pub use core_types::{DescriptorError, ElementType, KernelInstance, OperationDescriptor, Predicate};
pub use driver::{ArtifactCache, DriverError, GenerationEngine, GenerationRequest};
pub use fragments::{FragmentError, FragmentKind, FragmentStore, Substitutions};
pub use gemm_synth::{
    CallSite, Diagnostic, DispatchPlan, FunctionSynthesizer, GeneratedArtifact, PlannedShapes, Severity,
    ShapePlanner, ShapeSlot, SynthError,
};

/// Initialize logging. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Write `<function>.h` and `<function>.cu` into `dir`, returning both paths
pub fn write_artifact(artifact: &GeneratedArtifact, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("unable to create {}", dir.display()))?;

    let header = dir.join(format!("{}.h", artifact.function_name));
    let source = dir.join(format!("{}.cu", artifact.function_name));
    fs::write(&header, &artifact.declaration)
        .with_context(|| format!("unable to write {}", header.display()))?;
    fs::write(&source, &artifact.definition)
        .with_context(|| format!("unable to write {}", source.display()))?;
    Ok((header, source))
}
