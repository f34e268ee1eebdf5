//! The shared graph handle.

use tessera_store::FactStore;
use tracing::debug;

use crate::config::GraphConfig;
use crate::context::TxContext;
use crate::error::GraphResult;

/// A property graph stored in a fact store.
///
/// The handle itself holds no transaction state: every unit of work runs in
/// a [`TxContext`] obtained from [`Graph::begin`], so contexts on different
/// threads never observe each other's pending operations.
#[derive(Debug)]
pub struct Graph<S: FactStore> {
    store: S,
    config: GraphConfig,
}

impl<S: FactStore> Graph<S> {
    /// Create a graph with the default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: GraphConfig::default(),
        }
    }

    /// Create a graph with a validated configuration.
    pub fn with_config(store: S, config: GraphConfig) -> GraphResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Start a new transaction context.
    pub fn begin(&self) -> TxContext<'_, S> {
        debug!(graph = %self.config.name, "begin transaction");
        TxContext::new(self)
    }
}
