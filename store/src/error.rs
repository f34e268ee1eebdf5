//! Store error types.

use tessera_core::{Attribute, EntityRef, TempId, TxTime};
use thiserror::Error;

/// Errors raised by a fact store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The batch asserts and retracts the same fact, or otherwise disagrees with itself.
    #[error("contradiction on {entity} {attribute}: {reason}")]
    Contradiction {
        entity: EntityRef,
        attribute: String,
        reason: String,
    },

    /// A statement names a permanent entity the store does not hold.
    #[error("unknown entity: {entity}")]
    UnknownEntity { entity: EntityRef },

    /// A temporary id is used without being introduced by an assert in the same batch.
    #[error("unresolved temporary id: {temp_id}")]
    UnresolvedTempId { temp_id: TempId },

    /// No transaction with the given time.
    #[error("unknown transaction: {t}")]
    UnknownTransaction { t: TxTime },

    /// The store refused the batch.
    #[error("batch rejected: {reason}")]
    Rejected { reason: String },

    /// The store could not be reached.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn contradiction(
        entity: EntityRef,
        attribute: Option<&Attribute>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Contradiction {
            entity,
            attribute: attribute.map(|a| a.to_string()).unwrap_or_else(|| "*".to_string()),
            reason: reason.into(),
        }
    }

    pub fn unknown_entity(entity: impl Into<EntityRef>) -> Self {
        Self::UnknownEntity {
            entity: entity.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
