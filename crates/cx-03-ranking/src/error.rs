//! Error types for the Ranking Processor

use cx_01_idempotency_ledger::LedgerError;
use shared_store::StoreError;
use shared_types::{Classify, ErrorClass, InjectedFault, MatchId, UserId};
use thiserror::Error;

/// Ranking errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RankingError {
    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("Match {0} is not completed")]
    MatchNotCompleted(MatchId),

    #[error("Match {match_id} has {count} participants, need at least 2")]
    TooFewParticipants { match_id: MatchId, count: usize },

    #[error("Match {0} has no valid winner among its participants")]
    NoWinner(MatchId),

    /// One duel participant fenced without the other.
    #[error("Ledger out of sync for match {match_id}: {user} already fenced")]
    LedgerInconsistent { match_id: MatchId, user: UserId },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Fault(#[from] InjectedFault),
}

impl Classify for RankingError {
    fn class(&self) -> ErrorClass {
        match self {
            RankingError::MatchNotFound(_)
            | RankingError::MatchNotCompleted(_)
            | RankingError::TooFewParticipants { .. }
            | RankingError::NoWinner(_) => ErrorClass::Validation,
            RankingError::LedgerInconsistent { .. } => ErrorClass::InvariantViolation,
            RankingError::Ledger(e) => e.class(),
            RankingError::Storage(e) => e.class(),
            RankingError::Fault(e) => e.class(),
        }
    }
}

/// Result type for ranking operations
pub type RankingResult<T> = Result<T, RankingError>;
