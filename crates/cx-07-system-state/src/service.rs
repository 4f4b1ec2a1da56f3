//! System State Controller service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_bus::PlatformEvent;
use shared_store::{DocumentStore, StoreError};
use shared_types::{
    RiskMetrics, StateSnapshot, StateTransition, SystemState, SystemStateKind, SystemStateReader,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{next_state, HysteresisThresholds};
use crate::error::{SystemStateError, SystemStateResult};
use crate::ports::inbound::SystemStateApi;
use crate::ports::outbound::{
    Clock, EventPublisher, KeyValueStore, QueueMetricsSource, RiskSignalSource,
};

/// Key of the state record in the shared key-value store.
pub const SYSTEM_STATE_KEY: &str = "cortex:system_state";

/// System state configuration
#[derive(Debug, Clone)]
pub struct SystemStateConfig {
    pub thresholds: HysteresisThresholds,
    /// Look-back of the store-side risk counters.
    pub risk_window: chrono::Duration,
    pub evaluation_interval: Duration,
    pub state_key: String,
    /// Suspicion score above which a recent increase counts as a spike.
    pub suspicion_threshold: f64,
    /// Keep a forced CRITICAL until an operator releases it.
    pub hold_escalations: bool,
}

impl Default for SystemStateConfig {
    fn default() -> Self {
        Self {
            thresholds: HysteresisThresholds::default(),
            risk_window: chrono::Duration::hours(24),
            evaluation_interval: Duration::from_secs(15),
            state_key: SYSTEM_STATE_KEY.to_string(),
            suspicion_threshold: 50.0,
            hold_escalations: true,
        }
    }
}

/// Single logical writer of the system state record.
///
/// Evaluations and forced escalations are serialized through `writer`, so
/// two cycles in one process never interleave their read-decide-write.
pub struct SystemStateController {
    kv: Arc<dyn KeyValueStore>,
    store: Arc<DocumentStore>,
    queues: Arc<dyn QueueMetricsSource>,
    risk: Arc<dyn RiskSignalSource>,
    notifier: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    config: SystemStateConfig,
    writer: Mutex<()>,
}

impl SystemStateController {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        store: Arc<DocumentStore>,
        queues: Arc<dyn QueueMetricsSource>,
        risk: Arc<dyn RiskSignalSource>,
        notifier: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        config: SystemStateConfig,
    ) -> Self {
        Self {
            kv,
            store,
            queues,
            risk,
            notifier,
            clock,
            config,
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SystemStateConfig {
        &self.config
    }

    async fn load(&self) -> SystemStateResult<Option<SystemState>> {
        match self.kv.get(&self.config.state_key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Persisted record, or the initial record if there is none or it is unreadable.
    async fn load_or_initial(&self, now: DateTime<Utc>) -> SystemStateResult<SystemState> {
        match self.load().await {
            Ok(state) => Ok(state.unwrap_or_else(|| SystemState::initial(now))),
            Err(SystemStateError::CorruptRecord(e)) => {
                warn!(error = %e, "[cx-07] Unreadable state record, starting from NORMAL");
                Ok(SystemState::initial(now))
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, state: &SystemState) -> SystemStateResult<()> {
        let raw = serde_json::to_string(state)?;
        self.kv.set(&self.config.state_key, raw).await?;
        Ok(())
    }

    fn record_transition(&self, transition: StateTransition) -> SystemStateResult<()> {
        self.store.transaction(|c| {
            c.append_state_transition(transition);
            Ok::<_, StoreError>(())
        })?;
        Ok(())
    }

    async fn collect(&self, now: DateTime<Utc>) -> SystemStateResult<RiskMetrics> {
        let load = self.queues.queue_load().await;
        let signals = self.risk.risk_signals(now - self.config.risk_window).await?;
        Ok(RiskMetrics {
            max_queue_depth: load.max_depth,
            total_failed_jobs: load.total_failed,
            suspicion_spike: signals.suspicion_spike,
            ledger_conflicts: signals.ledger_conflicts,
            failed_payouts: signals.failed_payouts,
        })
    }

    async fn announce(&self, previous: SystemStateKind, next: SystemStateKind, reason: &str) {
        self.notifier
            .publish(PlatformEvent::SystemStateChanged {
                previous,
                next,
                reason: reason.to_string(),
            })
            .await;
    }

    fn is_held(&self, state: &SystemState) -> bool {
        self.config.hold_escalations
            && state.is_critical()
            && matches!(state.snapshot, Some(StateSnapshot::Escalation { .. }))
    }

    /// Lift a held escalation so the next evaluation may step the state down.
    ///
    /// The state itself stays CRITICAL until that evaluation runs.
    pub async fn release_escalation(&self, note: &str) -> SystemStateResult<SystemState> {
        let _writer = self.writer.lock().await;
        let now = self.clock.now();
        let mut state = self.load_or_initial(now).await?;
        if !self.is_held(&state) {
            return Ok(state);
        }
        state.reason = format!("Escalation released: {note}");
        state.snapshot = None;
        state.last_checked = now;
        self.save(&state).await?;
        info!(note, "[cx-07] Forced CRITICAL released by operator");
        Ok(state)
    }
}

#[async_trait]
impl SystemStateApi for SystemStateController {
    async fn get_system_state(&self) -> SystemStateResult<SystemState> {
        let now = self.clock.now();
        Ok(self.load().await?.unwrap_or_else(|| SystemState::initial(now)))
    }

    async fn evaluate(&self) -> SystemStateResult<SystemState> {
        let _writer = self.writer.lock().await;
        let now = self.clock.now();
        let metrics = self.collect(now).await?;
        let mut current = self.load_or_initial(now).await?;

        if self.is_held(&current) {
            debug!(reason = %current.reason, "[cx-07] Forced CRITICAL held, evaluation skipped");
            current.last_checked = now;
            self.save(&current).await?;
            return Ok(current);
        }

        let (state, reason) = match next_state(current.state, &metrics, &self.config.thresholds)
        {
            Some(decision) => (decision.next, decision.reason.to_string()),
            None => (current.state, current.reason.clone()),
        };
        let snapshot = StateSnapshot::Evaluated(metrics);
        let changed = state != current.state;

        if changed {
            self.record_transition(StateTransition {
                previous: current.state,
                next: state,
                trigger: reason.clone(),
                snapshot: snapshot.clone(),
                at: now,
            })?;
            warn!(
                previous = %current.state,
                next = %state,
                reason = %reason,
                max_queue_depth = metrics.max_queue_depth,
                failed_jobs = metrics.total_failed_jobs,
                suspicion_spike = metrics.suspicion_spike,
                ledger_conflicts = metrics.ledger_conflicts,
                failed_payouts = metrics.failed_payouts,
                "[cx-07] System state changed"
            );
        }

        let record = SystemState {
            state,
            reason,
            last_checked: now,
            snapshot: Some(snapshot),
        };
        self.save(&record).await?;

        if changed {
            self.announce(current.state, state, &record.reason).await;
        } else {
            debug!(state = %state, "[cx-07] System state evaluated");
        }
        Ok(record)
    }

    async fn force_critical(
        &self,
        reason: &str,
        source: &str,
        details: Vec<String>,
    ) -> SystemStateResult<SystemState> {
        let _writer = self.writer.lock().await;
        let now = self.clock.now();
        let previous = self.load_or_initial(now).await?.state;

        let snapshot = StateSnapshot::Escalation {
            source: source.to_string(),
            details,
        };
        let record = SystemState {
            state: SystemStateKind::Critical,
            reason: reason.to_string(),
            last_checked: now,
            snapshot: Some(snapshot.clone()),
        };
        // The escalation lands before the audit entry; a store outage must not block it.
        self.save(&record).await?;

        if previous != SystemStateKind::Critical {
            error!(
                previous = %previous,
                reason,
                source,
                "[cx-07] Invariant failure, forcing CRITICAL"
            );
            if let Err(e) = self.record_transition(StateTransition {
                previous,
                next: SystemStateKind::Critical,
                trigger: reason.to_string(),
                snapshot,
                at: now,
            }) {
                error!(error = %e, "[cx-07] Failed to log forced transition");
            }
            self.announce(previous, SystemStateKind::Critical, reason).await;
        }
        Ok(record)
    }

    async fn transitions(&self, limit: usize) -> SystemStateResult<Vec<StateTransition>> {
        Ok(self
            .store
            .read(|c| c.state_transitions().iter().rev().take(limit).cloned().collect::<Vec<_>>())?)
    }
}

#[async_trait]
impl SystemStateReader for SystemStateController {
    /// Falls back to NORMAL when the record cannot be read.
    async fn current_state(&self) -> SystemState {
        match self.get_system_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "[cx-07] System state unreadable, assuming NORMAL");
                SystemState::initial(self.clock.now())
            }
        }
    }
}
