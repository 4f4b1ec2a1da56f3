//! # Error Types
//!
//! Error taxonomy shared by every subsystem. Each subsystem error enum maps
//! its variants onto one [`ErrorClass`] so the worker loop can decide between
//! retrying, dropping and escalating without knowing the subsystem.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a failure must be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Bad input. Rejected immediately, never retried, no state mutated.
    Validation,
    /// Lock busy or effect already applied. Not an incident.
    Contention,
    /// Storage, queue or network hiccup. Retried with backoff.
    Transient,
    /// Economic mismatch or orphaned record. Escalates to CRITICAL.
    InvariantViolation,
}

impl ErrorClass {
    /// Whether the job queue should schedule another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Transient)
    }
}

/// Implemented by every subsystem error enum.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

/// Errors raised while validating entity input shared across subsystems.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityError {
    /// A match needs at least two participants.
    #[error("Match requires at least 2 participants, got {count}")]
    TooFewParticipants { count: usize },

    /// Winner is not one of the match participants.
    #[error("Winner {winner} is not a participant of the match")]
    WinnerNotParticipant { winner: String },

    /// Amount must be strictly positive.
    #[error("Amount must be positive, got {amount}")]
    NonPositiveAmount { amount: i64 },
}

impl Classify for EntityError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Validation
    }
}
