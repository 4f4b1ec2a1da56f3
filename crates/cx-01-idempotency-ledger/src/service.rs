//! Idempotency Ledger service

use std::sync::Arc;

use async_trait::async_trait;
use shared_store::{DocumentStore, StoreError};
use tracing::debug;

use crate::domain::{LedgerEntry, RecordOutcome};
use crate::error::{LedgerError, LedgerResult};
use crate::ports::inbound::IdempotencyLedgerApi;
use crate::ports::outbound::FenceWriter;

/// Ledger over the shared document store.
pub struct IdempotencyLedger {
    store: Arc<DocumentStore>,
}

impl IdempotencyLedger {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

/// Insert a fence, mapping a unique-index hit to `created = false`.
pub(crate) fn record(
    txn: &mut dyn FenceWriter,
    entry: &LedgerEntry,
) -> LedgerResult<RecordOutcome> {
    match txn.insert_fence(entry.fence()) {
        Ok(()) => Ok(RecordOutcome::created()),
        Err(StoreError::UniqueViolation { .. }) => {
            debug!(
                scope = entry.scope.as_str(),
                subject = %entry.subject,
                event = %entry.event,
                "[cx-01] Effect already applied, skipping"
            );
            Ok(RecordOutcome::already_applied())
        }
        Err(e) => Err(LedgerError::Storage(e)),
    }
}

#[async_trait]
impl IdempotencyLedgerApi for IdempotencyLedger {
    fn record_once_in(
        &self,
        txn: &mut dyn FenceWriter,
        entry: &LedgerEntry,
    ) -> LedgerResult<RecordOutcome> {
        record(txn, entry)
    }

    async fn record_once(&self, entry: &LedgerEntry) -> LedgerResult<RecordOutcome> {
        self.store.transaction(|txn| record(txn, entry))
    }

    async fn is_applied(&self, entry: &LedgerEntry) -> LedgerResult<bool> {
        let fence = entry.fence();
        Ok(self.store.read(|c| c.has_fence(&fence))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockFenceWriter;
    use shared_types::{Classify, ErrorClass, MatchId, UserId};

    #[tokio::test]
    async fn test_record_once_twice() {
        let ledger = IdempotencyLedger::new(Arc::new(DocumentStore::new()));
        let entry = LedgerEntry::ranking(UserId::new(), MatchId::new());

        assert!(ledger.record_once(&entry).await.unwrap().created);
        assert!(!ledger.record_once(&entry).await.unwrap().created);
        assert!(ledger.is_applied(&entry).await.unwrap());
    }

    #[tokio::test]
    async fn test_fence_rolls_back_with_aborted_effect() {
        let store = Arc::new(DocumentStore::new());
        let ledger = IdempotencyLedger::new(Arc::clone(&store));
        let entry = LedgerEntry::ranking(UserId::new(), MatchId::new());

        let result: LedgerResult<()> = store.transaction(|txn| {
            ledger.record_once_in(txn, &entry)?;
            Err(LedgerError::Storage(StoreError::Unavailable {
                reason: "write conflict".into(),
            }))
        });
        assert!(result.is_err());

        // The fence was discarded with the failed effect, so a retry applies.
        assert!(!ledger.is_applied(&entry).await.unwrap());
        assert!(ledger.record_once(&entry).await.unwrap().created);
    }

    #[test]
    fn test_other_storage_errors_propagate() {
        let ledger = IdempotencyLedger::new(Arc::new(DocumentStore::new()));
        let mut writer = MockFenceWriter::failing(StoreError::Unavailable {
            reason: "offline".into(),
        });
        let err = ledger
            .record_once_in(
                &mut writer,
                &LedgerEntry::integrity(UserId::new(), MatchId::new()),
            )
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Transient);
    }

    #[test]
    fn test_mock_writer_detects_duplicates() {
        let ledger = IdempotencyLedger::new(Arc::new(DocumentStore::new()));
        let mut writer = MockFenceWriter::new();
        let entry = LedgerEntry::integrity(UserId::new(), MatchId::new());
        assert!(ledger.record_once_in(&mut writer, &entry).unwrap().created);
        assert!(!ledger.record_once_in(&mut writer, &entry).unwrap().created);
        assert!(writer.has_fence(&entry.fence()));
    }
}
