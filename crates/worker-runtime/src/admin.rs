//! # Admin Console
//!
//! Operator surface of the core: state and transition history, forced
//! evaluation and escalation release, on-demand audits, chaos drills, queue
//! health and the metrics exposition. An HTTP layer maps its routes onto
//! these calls; callers are assumed to be admins.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cortex_telemetry::encode_metrics;
use cx_07_system_state::{SystemStateApi, SystemStateController};
use cx_08_reconciliation::{AuditReport, ReconciliationApi};
use prometheus::Registry;
use serde::Serialize;
use shared_bus::{InMemoryJobQueue, Job, JobCounts};
use shared_types::{FaultInjector, StateTransition, SystemState};
use tracing::{info, warn};

use crate::error::RuntimeResult;

/// Status of the chaos drill after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChaosStatus {
    pub enabled: bool,
    /// Time until the drill turns itself off.
    pub ttl: Option<Duration>,
}

pub struct AdminConsole {
    controller: Arc<SystemStateController>,
    reconciliation: Arc<dyn ReconciliationApi>,
    broker: Arc<InMemoryJobQueue>,
    faults: Arc<FaultInjector>,
    registry: Registry,
    chaos_ttl: Duration,
}

impl AdminConsole {
    pub fn new(
        controller: Arc<SystemStateController>,
        reconciliation: Arc<dyn ReconciliationApi>,
        broker: Arc<InMemoryJobQueue>,
        faults: Arc<FaultInjector>,
        registry: Registry,
        chaos_ttl: Duration,
    ) -> Self {
        Self {
            controller,
            reconciliation,
            broker,
            faults,
            registry,
            chaos_ttl,
        }
    }

    pub async fn system_state(&self) -> RuntimeResult<SystemState> {
        Ok(self.controller.get_system_state().await?)
    }

    /// Latest transitions, newest first.
    pub async fn state_history(&self, limit: usize) -> RuntimeResult<Vec<StateTransition>> {
        Ok(self.controller.transitions(limit).await?)
    }

    /// Run an evaluation cycle now instead of waiting for the schedule.
    pub async fn force_evaluation(&self) -> RuntimeResult<SystemState> {
        info!("[admin] Forced state evaluation");
        Ok(self.controller.evaluate().await?)
    }

    /// Lift a held forced CRITICAL after the underlying problem was fixed.
    pub async fn release_escalation(&self, note: &str) -> RuntimeResult<SystemState> {
        warn!(note, "[admin] Releasing held escalation");
        Ok(self.controller.release_escalation(note).await?)
    }

    pub async fn run_invariant_check(&self) -> RuntimeResult<AuditReport> {
        info!("[admin] Invariant check requested");
        Ok(self.reconciliation.validate_invariants().await?)
    }

    pub async fn run_reconciliation(&self, deep: bool) -> RuntimeResult<AuditReport> {
        info!(deep, "[admin] Reconciliation requested");
        let report = if deep {
            self.reconciliation.run_deep().await?
        } else {
            self.reconciliation.run_light().await?
        };
        Ok(report)
    }

    /// Enable or disable fault injection. Enabling always sets a TTL.
    pub fn toggle_chaos(&self, enabled: bool, ttl: Option<Duration>) -> ChaosStatus {
        let ttl = ttl.unwrap_or(self.chaos_ttl);
        let enabled = self.faults.toggle(enabled, ttl);
        ChaosStatus {
            enabled,
            ttl: enabled.then_some(ttl),
        }
    }

    pub fn chaos_active(&self) -> bool {
        self.faults.is_active()
    }

    /// Job counts of every declared queue.
    pub fn queue_health(&self) -> RuntimeResult<BTreeMap<String, JobCounts>> {
        self.broker
            .queue_names()
            .into_iter()
            .map(|name| {
                let counts = self.broker.counts_now(&name)?;
                Ok((name, counts))
            })
            .collect()
    }

    /// Jobs that exhausted their attempts on `queue`.
    pub fn dead_letters(&self, queue: &str) -> Vec<Job> {
        self.broker.dead_letters(queue)
    }

    /// Prometheus text exposition of the platform metrics.
    pub fn metrics_text(&self) -> RuntimeResult<String> {
        Ok(encode_metrics(&self.registry)?)
    }
}
