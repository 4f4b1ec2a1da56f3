//! Escrow decorator recording rejections and payouts.

use std::sync::Arc;

use async_trait::async_trait;
use cortex_telemetry::CortexMetrics;
use cx_04_escrow::{CreditReceipt, DebitReceipt, EscrowApi, EscrowResult, PayoutReceipt};
use shared_types::{TournamentId, UserId};

pub struct MeteredEscrow {
    inner: Arc<dyn EscrowApi>,
    metrics: Arc<CortexMetrics>,
}

impl MeteredEscrow {
    pub fn new(inner: Arc<dyn EscrowApi>, metrics: Arc<CortexMetrics>) -> Self {
        Self { inner, metrics }
    }

    fn observe<T>(&self, result: EscrowResult<T>) -> EscrowResult<T> {
        if let Err(e) = &result {
            self.metrics
                .escrow_rejections
                .with_label_values(&[e.code()])
                .inc();
        }
        result
    }
}

#[async_trait]
impl EscrowApi for MeteredEscrow {
    async fn debit_entry_fee(
        &self,
        user: UserId,
        tournament: TournamentId,
        key: Option<String>,
    ) -> EscrowResult<DebitReceipt> {
        let result = self.inner.debit_entry_fee(user, tournament, key).await;
        self.observe(result)
    }

    async fn join_tournament(
        &self,
        user: UserId,
        tournament: TournamentId,
        key: Option<String>,
    ) -> EscrowResult<DebitReceipt> {
        let result = self.inner.join_tournament(user, tournament, key).await;
        self.observe(result)
    }

    async fn credit_prize_payout(
        &self,
        tournament: TournamentId,
        winner: UserId,
    ) -> EscrowResult<PayoutReceipt> {
        let result = self.inner.credit_prize_payout(tournament, winner).await;
        if let Ok(receipt) = &result {
            if !receipt.already_paid {
                self.metrics.prize_payouts.inc();
            }
        }
        self.observe(result)
    }

    async fn deposit(&self, user: UserId, amount: i64, key: String) -> EscrowResult<CreditReceipt> {
        let result = self.inner.deposit(user, amount, key).await;
        self.observe(result)
    }

    async fn refund_entry_fee(
        &self,
        user: UserId,
        tournament: TournamentId,
    ) -> EscrowResult<CreditReceipt> {
        let result = self.inner.refund_entry_fee(user, tournament).await;
        self.observe(result)
    }

    async fn balance(&self, user: UserId) -> EscrowResult<i64> {
        self.inner.balance(user).await
    }
}
