//! Graph error types.

use tessera_core::{CoreError, ElementId};
use tessera_store::StoreError;
use tessera_transaction::TransactionError;
use thiserror::Error;

/// Errors surfaced by the graph API.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Staging error from the operation log or resolver.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Error reading from the fact store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store refused the batch; the transaction state was flushed.
    #[error("commit failed: {0}")]
    StoreCommitFailed(#[source] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// No element with this id is visible.
    #[error("element not found: {id}")]
    ElementNotFound { id: ElementId },

    /// The key is reserved or empty.
    #[error("invalid property key: {key:?}")]
    InvalidPropertyKey { key: String },

    /// An edge endpoint is not a vertex.
    #[error("element {id} is not a vertex")]
    NotAVertex { id: ElementId },

    /// The element has never been committed.
    #[error("element {id} has no committed history")]
    NoHistory { id: ElementId },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub fn element_not_found(id: ElementId) -> Self {
        Self::ElementNotFound { id }
    }

    pub fn invalid_property_key(key: impl Into<String>) -> Self {
        Self::InvalidPropertyKey { key: key.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
