//! Reconciliation service

use std::sync::Arc;

use async_trait::async_trait;
use shared_store::DocumentStore;
use tracing::{error, info};

use crate::domain::{
    scan_economy, scan_invariants, AuditFindings, AuditKind, AuditReport,
};
use crate::error::ReconciliationResult;
use crate::ports::inbound::ReconciliationApi;
use crate::ports::outbound::{Clock, CriticalEscalation, SystemStateReader};

/// Reconciliation configuration
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// Transactions a light audit checks for missing users.
    pub light_scan_limit: usize,
    /// Mismatched wallets quoted in a deep-audit failure line.
    pub mismatch_sample: usize,
    /// Oldest acceptable state evaluation.
    pub freshness_limit: chrono::Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            light_scan_limit: 10_000,
            mismatch_sample: 5,
            freshness_limit: chrono::Duration::minutes(5),
        }
    }
}

/// Economic and invariant auditors. Detection and escalation only.
pub struct ReconciliationService {
    store: Arc<DocumentStore>,
    state: Arc<dyn SystemStateReader>,
    escalation: Arc<dyn CriticalEscalation>,
    clock: Arc<dyn Clock>,
    config: ReconciliationConfig,
}

impl ReconciliationService {
    pub fn new(
        store: Arc<DocumentStore>,
        state: Arc<dyn SystemStateReader>,
        escalation: Arc<dyn CriticalEscalation>,
        clock: Arc<dyn Clock>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            store,
            state,
            escalation,
            clock,
            config,
        }
    }

    async fn economic(&self, kind: AuditKind) -> ReconciliationResult<AuditReport> {
        let deep = kind == AuditKind::Deep;
        info!(kind = kind.as_str(), "[cx-08] Starting reconciliation");

        let limit = self.config.light_scan_limit;
        match self.store.read(|c| scan_economy(c, deep, limit)) {
            Ok(findings) => {
                let failures = findings.failures(self.config.mismatch_sample);
                self.conclude(
                    kind,
                    "Economic Reconciliation Failure",
                    failures,
                    AuditFindings::Economy(findings),
                )
                .await
            }
            Err(e) => self.crashed(kind, "Economic Reconciliation Crash", e.to_string()).await,
        }
    }

    async fn conclude(
        &self,
        kind: AuditKind,
        reason: &str,
        failures: Vec<String>,
        findings: AuditFindings,
    ) -> ReconciliationResult<AuditReport> {
        let passed = failures.is_empty();
        if passed {
            info!(kind = kind.as_str(), "[cx-08] Audit passed");
        } else {
            error!(
                kind = kind.as_str(),
                failures = %failures.join("; "),
                "[cx-08] Discrepancy detected, initiating critical escalation"
            );
            self.escalation
                .escalate(reason, kind.source(), failures.clone())
                .await?;
        }
        Ok(AuditReport {
            kind,
            passed,
            failures,
            findings,
            escalated: !passed,
            checked_at: self.clock.now(),
        })
    }

    async fn crashed(
        &self,
        kind: AuditKind,
        reason: &str,
        error: String,
    ) -> ReconciliationResult<AuditReport> {
        error!(kind = kind.as_str(), error = %error, "[cx-08] Audit crashed");
        self.conclude(
            kind,
            reason,
            vec![format!("Audit crash: {error}")],
            AuditFindings::Crashed { error },
        )
        .await
    }
}

#[async_trait]
impl ReconciliationApi for ReconciliationService {
    async fn run_light(&self) -> ReconciliationResult<AuditReport> {
        self.economic(AuditKind::Light).await
    }

    async fn run_deep(&self) -> ReconciliationResult<AuditReport> {
        self.economic(AuditKind::Deep).await
    }

    async fn validate_invariants(&self) -> ReconciliationResult<AuditReport> {
        let kind = AuditKind::Invariant;
        let mut findings = match self.store.read(scan_invariants) {
            Ok(findings) => findings,
            Err(e) => return self.crashed(kind, "Production Invariant Crash", e.to_string()).await,
        };

        let age = self.clock.now() - self.state.current_state().await.last_checked;
        if age > self.config.freshness_limit {
            findings.stale_state_ms = Some(age.num_milliseconds());
        }

        self.conclude(
            kind,
            "Production Invariant Violation",
            findings.failures(),
            AuditFindings::Invariants(findings),
        )
        .await
    }
}
