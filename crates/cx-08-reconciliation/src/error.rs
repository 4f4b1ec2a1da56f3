//! Error types for the Reconciliation Auditors

use cx_07_system_state::SystemStateError;
use shared_types::{Classify, ErrorClass};
use thiserror::Error;

/// Reconciliation errors.
///
/// Findings are not errors: a failed audit is a successful run with a
/// failing report. Only a failed escalation surfaces here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error("Escalation to CRITICAL failed: {0}")]
    Escalation(#[from] SystemStateError),
}

impl Classify for ReconciliationError {
    fn class(&self) -> ErrorClass {
        match self {
            ReconciliationError::Escalation(e) => e.class(),
        }
    }
}

/// Result type for reconciliation operations
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;
