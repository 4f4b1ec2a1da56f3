//! Driven Ports (SPI - Outbound)
//!
//! - [`DistributedLockApi`]: tournament-scoped mutual exclusion
//! - [`PrizeDisbursement`]: the champion's payout
//! - [`EventPublisher`]: bracket notifications

use async_trait::async_trait;
use cx_04_escrow::{EscrowResult, PayoutReceipt};
use shared_types::{TournamentId, UserId};

pub use cx_02_lock_manager::DistributedLockApi;
pub use shared_bus::EventPublisher;
pub use shared_types::Clock;

/// Pays a tournament's prize pool. Must be idempotent per tournament.
#[async_trait]
pub trait PrizeDisbursement: Send + Sync {
    async fn disburse(&self, tournament: TournamentId, winner: UserId)
        -> EscrowResult<PayoutReceipt>;
}
