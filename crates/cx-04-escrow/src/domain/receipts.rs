use serde::{Deserialize, Serialize};
use shared_types::{TournamentId, UserId};

/// Default idempotency key of an entry-fee debit.
pub fn entry_fee_key(user: &UserId, tournament: &TournamentId) -> String {
    format!("entry_{user}_{tournament}")
}

/// Idempotency key of an entry-fee refund.
pub fn refund_key(user: &UserId, tournament: &TournamentId) -> String {
    format!("refund_{user}_{tournament}")
}

/// Result of an entry-fee debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitReceipt {
    pub user: UserId,
    pub tournament: TournamentId,
    /// Amount charged. Zero for free tournaments.
    pub fee: i64,
    pub new_balance: i64,
}

/// Result of a prize payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub tournament: TournamentId,
    pub winner: UserId,
    pub payout: i64,
    /// Pool exceeded the payout cap and was clamped.
    pub capped: bool,
    /// An earlier finalization already paid this tournament.
    pub already_paid: bool,
}

/// Result of a deposit or refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditReceipt {
    pub user: UserId,
    pub amount: i64,
    pub new_balance: i64,
}
