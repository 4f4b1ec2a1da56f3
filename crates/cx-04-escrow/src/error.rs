//! Error types for the Escrow Ledger

use shared_store::StoreError;
use shared_types::{Classify, ErrorClass, InjectedFault, TournamentId, UserId};
use thiserror::Error;

/// Escrow errors. Rejections carry a stable code, see [`EscrowError::code`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    #[error("Daily platform transfer limit exceeded: spent {spent}, fee {fee}, cap {cap}")]
    DailyLimitExceeded { spent: i64, fee: i64, cap: i64 },

    #[error("Entry fee {fee} exceeds maximum allowed {cap}")]
    FeeCapExceeded { fee: i64, cap: i64 },

    #[error("Payouts frozen while system is CRITICAL: {reason}")]
    SystemCritical { reason: String },

    #[error("Idempotency key {key} already used")]
    DuplicateRequest { key: String },

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Tournament {0} not found")]
    TournamentNotFound(TournamentId),

    #[error("Tournament {0} is not open for registration")]
    TournamentClosed(TournamentId),

    #[error("Tournament {0} is full")]
    TournamentFull(TournamentId),

    #[error("User {user} is already registered for tournament {tournament}")]
    AlreadyRegistered { user: UserId, tournament: TournamentId },

    #[error("No entry fee paid by {user} for tournament {tournament}")]
    NoEntryFee { user: UserId, tournament: TournamentId },

    #[error("Entry fee of {user} for tournament {tournament} already refunded")]
    AlreadyRefunded { user: UserId, tournament: TournamentId },

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Fault(#[from] InjectedFault),
}

impl EscrowError {
    /// Stable machine-readable code surfaced to callers.
    pub fn code(&self) -> &'static str {
        match self {
            EscrowError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            EscrowError::DailyLimitExceeded { .. } => "DAILY_LIMIT_EXCEEDED",
            EscrowError::FeeCapExceeded { .. } => "FEE_CAP_EXCEEDED",
            EscrowError::SystemCritical { .. } => "SYSTEM_CRITICAL",
            EscrowError::DuplicateRequest { .. } => "DUPLICATE_REQUEST",
            EscrowError::UserNotFound(_) => "USER_NOT_FOUND",
            EscrowError::TournamentNotFound(_) => "TOURNAMENT_NOT_FOUND",
            EscrowError::TournamentClosed(_) => "TOURNAMENT_CLOSED",
            EscrowError::TournamentFull(_) => "TOURNAMENT_FULL",
            EscrowError::AlreadyRegistered { .. } => "ALREADY_REGISTERED",
            EscrowError::NoEntryFee { .. } => "NO_ENTRY_FEE",
            EscrowError::AlreadyRefunded { .. } => "ALREADY_REFUNDED",
            EscrowError::InvalidAmount(_) => "INVALID_AMOUNT",
            EscrowError::Storage(_) => "STORAGE_ERROR",
            EscrowError::Fault(_) => "INJECTED_FAULT",
        }
    }
}

impl Classify for EscrowError {
    fn class(&self) -> ErrorClass {
        match self {
            EscrowError::InsufficientFunds { .. }
            | EscrowError::DailyLimitExceeded { .. }
            | EscrowError::FeeCapExceeded { .. }
            | EscrowError::UserNotFound(_)
            | EscrowError::TournamentNotFound(_)
            | EscrowError::TournamentClosed(_)
            | EscrowError::TournamentFull(_)
            | EscrowError::AlreadyRegistered { .. }
            | EscrowError::NoEntryFee { .. }
            | EscrowError::AlreadyRefunded { .. }
            | EscrowError::InvalidAmount(_) => ErrorClass::Validation,
            EscrowError::DuplicateRequest { .. } => ErrorClass::Contention,
            // The freeze lifts when the state steps down; retry with backoff.
            EscrowError::SystemCritical { .. } => ErrorClass::Transient,
            EscrowError::Storage(e) => e.class(),
            EscrowError::Fault(e) => e.class(),
        }
    }
}

/// Result type for escrow operations
pub type EscrowResult<T> = Result<T, EscrowError>;
