//! Driving Ports (API - Inbound)

use async_trait::async_trait;

use crate::domain::{LedgerEntry, RecordOutcome};
use crate::error::LedgerResult;
use crate::ports::outbound::FenceWriter;

/// Primary ledger API.
#[async_trait]
pub trait IdempotencyLedgerApi: Send + Sync {
    /// Insert a fence inside the caller's transaction.
    ///
    /// Must be called from the same transaction that applies the guarded
    /// effect. `created = false` means the caller must skip the effect.
    fn record_once_in(
        &self,
        txn: &mut dyn FenceWriter,
        entry: &LedgerEntry,
    ) -> LedgerResult<RecordOutcome>;

    /// Insert a fence in its own transaction.
    async fn record_once(&self, entry: &LedgerEntry) -> LedgerResult<RecordOutcome>;

    /// Whether the fence exists.
    async fn is_applied(&self, entry: &LedgerEntry) -> LedgerResult<bool>;
}
