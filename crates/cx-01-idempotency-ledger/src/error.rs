//! Error types for the Idempotency Ledger

use shared_store::StoreError;
use shared_types::{Classify, ErrorClass};
use thiserror::Error;

/// Ledger errors. A unique-index hit is not one of them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger storage error: {0}")]
    Storage(#[from] StoreError),
}

impl Classify for LedgerError {
    fn class(&self) -> ErrorClass {
        match self {
            LedgerError::Storage(e) => e.class(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
