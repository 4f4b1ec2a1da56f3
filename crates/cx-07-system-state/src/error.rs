//! Error types for the System State Controller

use shared_bus::QueueError;
use shared_store::StoreError;
use shared_types::{Classify, ErrorClass};
use thiserror::Error;

/// System state errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SystemStateError {
    #[error("Stored system state is unreadable: {0}")]
    CorruptRecord(String),

    #[error("Invalid hysteresis thresholds: {0}")]
    InvalidThresholds(String),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl Classify for SystemStateError {
    fn class(&self) -> ErrorClass {
        match self {
            SystemStateError::CorruptRecord(_) => ErrorClass::InvariantViolation,
            SystemStateError::InvalidThresholds(_) => ErrorClass::Validation,
            SystemStateError::Queue(e) => e.class(),
            SystemStateError::Storage(e) => e.class(),
        }
    }
}

impl From<serde_json::Error> for SystemStateError {
    fn from(e: serde_json::Error) -> Self {
        SystemStateError::CorruptRecord(e.to_string())
    }
}

/// Result type for system state operations
pub type SystemStateResult<T> = Result<T, SystemStateError>;
