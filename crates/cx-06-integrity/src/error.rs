//! Error types for the Integrity Analyzer

use cx_01_idempotency_ledger::LedgerError;
use shared_store::StoreError;
use shared_types::{Classify, ErrorClass, MatchId};
use thiserror::Error;

/// Integrity errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("Match {0} is not completed")]
    MatchNotCompleted(MatchId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl Classify for IntegrityError {
    fn class(&self) -> ErrorClass {
        match self {
            IntegrityError::MatchNotFound(_) | IntegrityError::MatchNotCompleted(_) => {
                ErrorClass::Validation
            }
            IntegrityError::Ledger(e) => e.class(),
            IntegrityError::Storage(e) => e.class(),
        }
    }
}

/// Result type for integrity operations
pub type IntegrityResult<T> = Result<T, IntegrityError>;
