use std::{
    collections::HashMap,
    sync::Arc,
};
use parking_lot::Mutex;

use gemm_synth::{GeneratedArtifact, SynthError};

use crate::request::GenerationRequest;

/// Structure for sharing generated artifacts between identical requests.
pub struct ArtifactCache {
    cache: Mutex<HashMap<GenerationRequest, Arc<GeneratedArtifact>>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self { cache: Mutex::new(HashMap::new()) }
    }

    /// Return the cached artifact for `request`, or run `generate` and
    /// keep its result. Failed generations are not cached.
    pub fn get_or_generate<F>(
        &self,
        request: &GenerationRequest,
        generate: F,
    ) -> Result<Arc<GeneratedArtifact>, SynthError>
    where
        F: FnOnce() -> Result<GeneratedArtifact, SynthError>,
    {
        // cache lookup
        if let Some(a) = self.cache.lock().get(request) {
            tracing::debug!(function = %request.function_name(), "artifact cache hit");
            return Ok(a.clone());
        }

        // generate outside the lock; a concurrent duplicate keeps the first insert
        let artifact = Arc::new(generate()?);
        let mut cache = self.cache.lock();
        let entry = cache.entry(request.clone()).or_insert(artifact);
        Ok(entry.clone())
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}
