//! Transaction error types.

use tessera_core::{ElementId, TempId};
use thiserror::Error;

/// Transaction errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The element was not added in this transaction.
    #[error("element {element} was not added in this transaction")]
    NotInTransaction { element: ElementId },

    /// The element has a pending operation other than an add.
    #[error("element {element} has a pending operation that is not an add")]
    NotStaged { element: ElementId },

    /// The element's add was cancelled earlier in this transaction.
    #[error("the add of element {element} was cancelled in this transaction")]
    StaleOperation { element: ElementId },

    /// The element is already deleted in this transaction.
    #[error("element {element} is already deleted in this transaction")]
    AlreadyDeleted { element: ElementId },

    /// The statement does not fit the operation it was recorded as.
    #[error("invalid statement: {reason}")]
    InvalidStatement { reason: String },

    /// Identity resolution found the resolver out of sync with the store.
    #[error("consistency violation for element {element} ({temp_id}): {reason}")]
    ConsistencyViolation {
        element: ElementId,
        temp_id: TempId,
        reason: String,
    },
}

impl TransactionError {
    pub fn invalid_statement(reason: impl Into<String>) -> Self {
        Self::InvalidStatement {
            reason: reason.into(),
        }
    }

    pub fn consistency_violation(
        element: ElementId,
        temp_id: TempId,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConsistencyViolation {
            element,
            temp_id,
            reason: reason.into(),
        }
    }
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
