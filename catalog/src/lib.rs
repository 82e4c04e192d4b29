use std::collections::HashMap;

use core_types::{KernelInstance, Predicate, is_c_identifier};
use fragments::{FragmentError, FragmentKind, FragmentStore, Substitutions};
use thiserror::Error;
use tracing::debug;

/// Errors while registering or rendering instances
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("duplicate instance symbol `{symbol}`")]
    DuplicateSymbol { symbol: String },

    #[error("instance symbol `{symbol}` is not a valid C identifier")]
    InvalidSymbol { symbol: String },

    #[error("instance `{symbol}` has an empty predicate")]
    EmptyPredicate { symbol: String },

    #[error(transparent)]
    Fragment(#[from] FragmentError),
}

/// Ordered set of candidate instances for one generation request.
///
/// Registration order is dispatch order: the first instance whose
/// predicate holds at runtime is the one launched.
#[derive(Debug, Clone, Default)]
pub struct InstanceCatalog {
    instances: Vec<KernelInstance>,
    index:     HashMap<String, usize>,
}

impl InstanceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every instance in order, stopping at the first rejection
    pub fn from_instances<I>(instances: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = KernelInstance>,
    {
        let mut catalog = Self::new();
        for inst in instances {
            catalog.register(inst)?;
        }
        Ok(catalog)
    }

    /// Append an instance; its symbol must be a fresh C identifier
    pub fn register(&mut self, instance: KernelInstance) -> Result<(), CatalogError> {
        let symbol = &instance.symbol_name;
        if !is_c_identifier(symbol) {
            return Err(CatalogError::InvalidSymbol { symbol: symbol.clone() });
        }
        if self.index.contains_key(symbol) {
            return Err(CatalogError::DuplicateSymbol { symbol: symbol.clone() });
        }
        if matches!(&instance.predicate, Predicate::When(expr) if expr.trim().is_empty()) {
            return Err(CatalogError::EmptyPredicate { symbol: symbol.clone() });
        }

        debug!(
            symbol = %symbol,
            position = self.instances.len(),
            catch_all = instance.predicate.is_catch_all(),
            "registered kernel instance"
        );
        self.index.insert(symbol.clone(), self.instances.len());
        self.instances.push(instance);
        Ok(())
    }

    /// Alias fragment of every instance, in registration order
    pub fn render_all(&self, store: &FragmentStore) -> Result<Vec<String>, CatalogError> {
        self.instances
            .iter()
            .map(|inst| {
                let subs = Substitutions::new()
                    .set("config", inst.configuration_text.as_str())
                    .set("name", inst.symbol_name.as_str())
                    .set("config_name", inst.config_name.as_str());
                store.render(FragmentKind::InstanceAlias, &subs).map_err(CatalogError::from)
            })
            .collect()
    }

    pub fn get(&self, symbol: &str) -> Option<&KernelInstance> {
        self.index.get(symbol).map(|&i| &self.instances[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &KernelInstance> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl TryFrom<Vec<KernelInstance>> for InstanceCatalog {
    type Error = CatalogError;

    fn try_from(instances: Vec<KernelInstance>) -> Result<Self, Self::Error> {
        Self::from_instances(instances)
    }
}
