//! Store error types

use shared_types::{Classify, ErrorClass};
use thiserror::Error;

/// Errors raised by the storage engines.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Document does not exist.
    #[error("{collection} not found: {id}")]
    NotFound { collection: &'static str, id: String },

    /// Insert violated a unique index.
    #[error("Unique index violation on {index}")]
    UniqueViolation { index: &'static str },

    /// Engine unreachable or refused the operation.
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn not_found(collection: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            collection,
            id: id.to_string(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

impl Classify for StoreError {
    fn class(&self) -> ErrorClass {
        match self {
            StoreError::NotFound { .. } => ErrorClass::Validation,
            StoreError::UniqueViolation { .. } => ErrorClass::Contention,
            StoreError::Unavailable { .. } => ErrorClass::Transient,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
