//! Error types for the worker runtime

use cortex_telemetry::TelemetryError;
use cx_02_lock_manager::LockError;
use cx_07_system_state::SystemStateError;
use cx_08_reconciliation::ReconciliationError;
use shared_bus::QueueError;
use shared_store::StoreError;
use shared_types::{Classify, ErrorClass};
use thiserror::Error;

use crate::config::ConfigError;

/// Runtime wiring and operator errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    SystemState(#[from] SystemStateError),

    #[error(transparent)]
    Audit(#[from] ReconciliationError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("Prediction client: {0}")]
    Http(#[from] reqwest::Error),
}

impl Classify for RuntimeError {
    fn class(&self) -> ErrorClass {
        match self {
            RuntimeError::Config(_) => ErrorClass::Validation,
            RuntimeError::Lock(e) => e.class(),
            RuntimeError::Queue(e) => e.class(),
            RuntimeError::Storage(e) => e.class(),
            RuntimeError::SystemState(e) => e.class(),
            RuntimeError::Audit(e) => e.class(),
            RuntimeError::Telemetry(_) | RuntimeError::Http(_) => ErrorClass::Transient,
        }
    }
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
