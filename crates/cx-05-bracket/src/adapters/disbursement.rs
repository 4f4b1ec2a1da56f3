//! Prize disbursement adapters.

use std::sync::Arc;

use async_trait::async_trait;
use cx_04_escrow::{EscrowApi, EscrowError, EscrowResult, PayoutReceipt};
use parking_lot::Mutex;
use shared_types::{TournamentId, UserId};

use crate::ports::outbound::PrizeDisbursement;

/// Production adapter: the Escrow Ledger's idempotent payout.
pub struct EscrowDisbursement {
    escrow: Arc<dyn EscrowApi>,
}

impl EscrowDisbursement {
    pub fn new(escrow: Arc<dyn EscrowApi>) -> Self {
        Self { escrow }
    }
}

#[async_trait]
impl PrizeDisbursement for EscrowDisbursement {
    async fn disburse(
        &self,
        tournament: TournamentId,
        winner: UserId,
    ) -> EscrowResult<PayoutReceipt> {
        self.escrow.credit_prize_payout(tournament, winner).await
    }
}

/// Test adapter recording payouts, paying each tournament once.
#[derive(Debug, Default)]
pub struct MockDisbursement {
    paid: Mutex<Vec<(TournamentId, UserId)>>,
    fail_with: Mutex<Option<EscrowError>>,
}

impl MockDisbursement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every payout with `err` until cleared with `None`.
    pub fn set_failure(&self, err: Option<EscrowError>) {
        *self.fail_with.lock() = err;
    }

    pub fn payouts(&self) -> Vec<(TournamentId, UserId)> {
        self.paid.lock().clone()
    }
}

#[async_trait]
impl PrizeDisbursement for MockDisbursement {
    async fn disburse(
        &self,
        tournament: TournamentId,
        winner: UserId,
    ) -> EscrowResult<PayoutReceipt> {
        if let Some(err) = self.fail_with.lock().clone() {
            return Err(err);
        }

        let mut paid = self.paid.lock();
        let already_paid = paid.iter().any(|(t, _)| *t == tournament);
        if !already_paid {
            paid.push((tournament, winner));
        }
        Ok(PayoutReceipt {
            tournament,
            winner,
            payout: 0,
            capped: false,
            already_paid,
        })
    }
}
