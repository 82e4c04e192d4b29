mod artifact_cache;
pub mod request;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use catalog::InstanceCatalog;
use fragments::FragmentStore;
use gemm_synth::{FunctionSynthesizer, GeneratedArtifact};
use thiserror::Error;
use tracing::debug;

pub use artifact_cache::ArtifactCache;
pub use request::GenerationRequest;

/// Batch-level errors, on top of the per-request synthesis errors
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("`{name}` is generated by requests #{first} and #{second} with different contents")]
    ConflictingFunction { name: String, first: usize, second: usize },
}

/// Runs generation requests against one shared fragment store.
pub struct GenerationEngine {
    store: Arc<FragmentStore>,
    cache: ArtifactCache,
}

impl GenerationEngine {
    /// Engine over the built-in fragments
    pub fn new() -> anyhow::Result<Self> {
        let store = FragmentStore::new().context("built-in fragments failed to compile")?;
        Ok(Self::with_store(Arc::new(store)))
    }

    pub fn with_store(store: Arc<FragmentStore>) -> Self {
        Self { store, cache: ArtifactCache::new() }
    }

    /// Generate (or reuse) the artifact of one request
    pub fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Arc<GeneratedArtifact>> {
        self.cache
            .get_or_generate(request, || {
                let catalog = InstanceCatalog::from_instances(request.instances.iter().cloned())?;
                FunctionSynthesizer::new(&self.store).synthesize(&request.descriptor, &catalog, &request.shapes)
            })
            .with_context(|| format!("failed to generate `{}`", request.function_name()))
    }

    /// Generate independent requests in parallel. Results keep the input
    /// order; a request reusing another request's function name with
    /// different contents fails instead of producing a second definition.
    pub fn generate_all(&self, requests: &[GenerationRequest]) -> Vec<anyhow::Result<Arc<GeneratedArtifact>>> {
        let mut owners: HashMap<&str, usize> = HashMap::new();
        let conflicts: Vec<Option<DriverError>> = requests
            .iter()
            .enumerate()
            .map(|(i, req)| {
                let first = *owners.entry(req.function_name()).or_insert(i);
                (first != i && requests[first] != *req).then(|| DriverError::ConflictingFunction {
                    name: req.function_name().to_string(),
                    first,
                    second: i,
                })
            })
            .collect();

        // at most one worker per available core, each taking a contiguous run
        let workers = thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .min(requests.len())
            .max(1);
        let per_worker = requests.len().div_ceil(workers);
        let mut jobs = requests.iter().zip(conflicts);
        let batches: Vec<Vec<_>> = std::iter::from_fn(|| {
            let batch: Vec<_> = jobs.by_ref().take(per_worker).collect();
            (!batch.is_empty()).then_some(batch)
        })
        .collect();
        debug!(requests = requests.len(), workers = batches.len(), "generating batch");

        thread::scope(|s| {
            let handles: Vec<_> = batches
                .into_iter()
                .map(|batch| {
                    let n = batch.len();
                    let handle = s.spawn(move || {
                        batch
                            .into_iter()
                            .map(|(req, conflict)| match conflict {
                                Some(e) => Err(e.into()),
                                None => self.generate(req),
                            })
                            .collect::<Vec<_>>()
                    });
                    (n, handle)
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|(n, h)| {
                    h.join().unwrap_or_else(|_| {
                        std::iter::repeat_with(|| Err(anyhow::anyhow!("generation thread panicked")))
                            .take(n)
                            .collect()
                    })
                })
                .collect()
        })
    }

    /// Number of distinct artifacts generated so far
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}


/* ------------------------------------------------------------------------- */
/*                                  Tests                                    */
/* ------------------------------------------------------------------------- */
