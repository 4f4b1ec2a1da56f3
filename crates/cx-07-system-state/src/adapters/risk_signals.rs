//! Risk counters read from the document store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_store::DocumentStore;
use shared_types::{TransactionKind, TransactionStatus};

use crate::domain::RiskSignals;
use crate::error::SystemStateResult;
use crate::ports::outbound::RiskSignalSource;

/// Counts suspicion spikes, ledger conflicts and failed payouts.
pub struct StoreRiskSignals {
    store: Arc<DocumentStore>,
    suspicion_threshold: f64,
}

impl StoreRiskSignals {
    pub fn new(store: Arc<DocumentStore>, suspicion_threshold: f64) -> Self {
        Self {
            store,
            suspicion_threshold,
        }
    }
}

/// Failed transaction rejected for reusing an idempotency key.
fn is_ledger_conflict(notes: &str) -> bool {
    let notes = notes.to_ascii_lowercase();
    notes.contains("duplicate") || notes.contains("idempotency")
}

#[async_trait]
impl RiskSignalSource for StoreRiskSignals {
    async fn risk_signals(&self, since: DateTime<Utc>) -> SystemStateResult<RiskSignals> {
        let threshold = self.suspicion_threshold;
        let signals = self.store.read(|c| {
            let suspicion_spike = c
                .competitors
                .values()
                .filter(|u| {
                    u.integrity.suspicion_score > threshold
                        && u.integrity
                            .last_suspicion_increase_at
                            .is_some_and(|at| at >= since)
                })
                .count() as u64;

            let mut signals = RiskSignals {
                suspicion_spike,
                ..RiskSignals::default()
            };
            for tx in c
                .transactions()
                .iter()
                .filter(|tx| tx.status == TransactionStatus::Failed && tx.created_at >= since)
            {
                if is_ledger_conflict(&tx.notes) {
                    signals.ledger_conflicts += 1;
                }
                if tx.kind == TransactionKind::PrizePayout {
                    signals.failed_payouts += 1;
                }
            }
            signals
        })?;
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shared_store::StoreError;
    use shared_types::{Competitor, IntegrityRecord, Transaction, TransactionReference, TournamentId};

    #[tokio::test]
    async fn test_counts_within_window() {
        let store = Arc::new(DocumentStore::new());
        let now = Utc::now();
        let old = now - Duration::hours(30);

        let mut spiking = Competitor::new("spiking");
        spiking.integrity = IntegrityRecord {
            suspicion_score: 55.0,
            last_suspicion_increase_at: Some(now - Duration::hours(1)),
            ..IntegrityRecord::default()
        };
        let mut stale = Competitor::new("stale");
        stale.integrity = IntegrityRecord {
            suspicion_score: 80.0,
            last_suspicion_increase_at: Some(old),
            ..IntegrityRecord::default()
        };
        let user = spiking.id;
        let t = Some(TransactionReference::Tournament(TournamentId::new()));

        store
            .transaction(|c| {
                c.put_competitor(spiking);
                c.put_competitor(stale);
                for (kind, notes, at) in [
                    (TransactionKind::EntryFee, "DUPLICATE_REQUEST: key reused", now),
                    (TransactionKind::Deposit, "Idempotency key conflict", now),
                    (TransactionKind::PrizePayout, "SYSTEM_CRITICAL: frozen", now),
                    (TransactionKind::PrizePayout, "SYSTEM_CRITICAL: frozen", old),
                ] {
                    c.insert_transaction(Transaction::failed(user, kind, 0, 0, t.clone(), notes, at))?;
                }
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let signals = StoreRiskSignals::new(store, 50.0)
            .risk_signals(now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(
            signals,
            RiskSignals {
                suspicion_spike: 1,
                ledger_conflicts: 2,
                failed_payouts: 1,
            }
        );
    }
}
