//! Common error types for Tessera.

use thiserror::Error;

/// Errors raised while building core values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed attribute name or namespace.
    #[error("invalid attribute {name:?}: {reason}")]
    InvalidAttribute { name: String, reason: String },
}

impl CoreError {
    pub fn invalid_attribute(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
