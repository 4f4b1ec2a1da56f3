//! Driving Ports (API - Inbound)

use async_trait::async_trait;
use shared_types::{TournamentId, UserId};

use crate::domain::{CreditReceipt, DebitReceipt, PayoutReceipt};
use crate::error::EscrowResult;

/// Primary Escrow API. Every method is one atomic transaction.
#[async_trait]
pub trait EscrowApi: Send + Sync {
    /// Charge the tournament's entry fee.
    ///
    /// `key` defaults to [`entry_fee_key`](crate::entry_fee_key). A reused
    /// key fails with `DUPLICATE_REQUEST`.
    async fn debit_entry_fee(
        &self,
        user: UserId,
        tournament: TournamentId,
        key: Option<String>,
    ) -> EscrowResult<DebitReceipt>;

    /// Register `user` and charge the entry fee in the same transaction.
    async fn join_tournament(
        &self,
        user: UserId,
        tournament: TournamentId,
        key: Option<String>,
    ) -> EscrowResult<DebitReceipt>;

    /// Pay the tournament's prize pool to `winner`, at most once per tournament.
    async fn credit_prize_payout(
        &self,
        tournament: TournamentId,
        winner: UserId,
    ) -> EscrowResult<PayoutReceipt>;

    async fn deposit(&self, user: UserId, amount: i64, key: String) -> EscrowResult<CreditReceipt>;

    /// Return a paid entry fee. At most once per (user, tournament).
    async fn refund_entry_fee(
        &self,
        user: UserId,
        tournament: TournamentId,
    ) -> EscrowResult<CreditReceipt>;

    async fn balance(&self, user: UserId) -> EscrowResult<i64>;
}
