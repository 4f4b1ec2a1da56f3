//! Error types for the Lock Manager

use shared_types::{Classify, ErrorClass};
use thiserror::Error;

/// Lock manager errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    /// Quorum not reached within the retry budget.
    #[error("Could not acquire {resources} after {attempts} attempts")]
    Contention { resources: String, attempts: u32 },

    /// A lock node failed.
    #[error("Lock node {node} error: {reason}")]
    Backend { node: String, reason: String },

    /// Manager built without nodes or called without resources.
    #[error("Invalid lock request: {0}")]
    InvalidRequest(String),
}

impl Classify for LockError {
    fn class(&self) -> ErrorClass {
        match self {
            LockError::Contention { .. } => ErrorClass::Contention,
            LockError::Backend { .. } => ErrorClass::Transient,
            LockError::InvalidRequest(_) => ErrorClass::Validation,
        }
    }
}

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;
