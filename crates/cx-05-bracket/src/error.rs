//! Error types for the Bracket Automator

use cx_02_lock_manager::LockError;
use cx_04_escrow::EscrowError;
use shared_store::StoreError;
use shared_types::{Classify, ErrorClass, InjectedFault, MatchId, TournamentId};
use thiserror::Error;

/// Bracket errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BracketError {
    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("Tournament {0} not found")]
    TournamentNotFound(TournamentId),

    #[error("Tournament {tournament} needs at least 2 participants, has {count}")]
    TooFewParticipants { tournament: TournamentId, count: usize },

    /// A completed round has a match without a winner.
    #[error("Round {round} of tournament {tournament} completed with a missing winner")]
    MissingWinner { tournament: TournamentId, round: u32 },

    /// The lease expired before the critical section finished.
    #[error("Lock on tournament {0} lost during advancement")]
    LockLost(TournamentId),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Prize payout failed: {0}")]
    Payout(#[from] EscrowError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Fault(#[from] InjectedFault),
}

impl Classify for BracketError {
    fn class(&self) -> ErrorClass {
        match self {
            BracketError::MatchNotFound(_)
            | BracketError::TournamentNotFound(_)
            | BracketError::TooFewParticipants { .. }
            | BracketError::MissingWinner { .. } => ErrorClass::Validation,
            BracketError::LockLost(_) => ErrorClass::Transient,
            BracketError::Lock(e) => e.class(),
            BracketError::Payout(e) => e.class(),
            BracketError::Storage(e) => e.class(),
            BracketError::Fault(e) => e.class(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
