//! Consumers of the scheduled jobs.

use std::sync::Arc;

use async_trait::async_trait;
use cortex_telemetry::CortexMetrics;
use cx_06_integrity::IntegrityApi;
use cx_07_system_state::SystemStateApi;
use cx_08_reconciliation::{AuditReport, ReconciliationApi};
use shared_bus::{
    Job, JobFailure, JobHandler, CHECK_SEASONS_JOB, DEEP_AUDIT_JOB, EVALUATE_STATE_JOB,
    INVARIANT_AUDIT_JOB, LIGHT_AUDIT_JOB,
};
use shared_types::{ErrorClass, StateSnapshot};
use tracing::{info, warn};

/// Serves the system queue: state evaluation and the three audits.
pub struct SystemJobHandler {
    controller: Arc<dyn SystemStateApi>,
    reconciliation: Arc<dyn ReconciliationApi>,
    metrics: Arc<CortexMetrics>,
}

impl SystemJobHandler {
    pub fn new(
        controller: Arc<dyn SystemStateApi>,
        reconciliation: Arc<dyn ReconciliationApi>,
        metrics: Arc<CortexMetrics>,
    ) -> Self {
        Self {
            controller,
            reconciliation,
            metrics,
        }
    }

    async fn evaluate(&self) -> Result<(), JobFailure> {
        let state = self
            .controller
            .evaluate()
            .await
            .map_err(|e| JobFailure::from_error(&e))?;
        match &state.snapshot {
            Some(StateSnapshot::Evaluated(metrics)) => self.metrics.observe_state(
                state.state.level(),
                metrics.max_queue_depth,
                metrics.total_failed_jobs,
            ),
            _ => self.metrics.system_state.set(state.state.level()),
        }
        Ok(())
    }

    fn record(&self, report: &AuditReport) {
        if report.passed {
            info!(kind = report.kind.as_str(), "[worker] Audit passed");
            return;
        }
        self.metrics
            .audit_failures
            .with_label_values(&[report.kind.as_str()])
            .inc();
        warn!(
            kind = report.kind.as_str(),
            failures = report.failures.len(),
            escalated = report.escalated,
            "[worker] Audit failed"
        );
    }
}

#[async_trait]
impl JobHandler for SystemJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobFailure> {
        let report = match job.name.as_str() {
            EVALUATE_STATE_JOB => return self.evaluate().await,
            LIGHT_AUDIT_JOB => self.reconciliation.run_light().await,
            DEEP_AUDIT_JOB => self.reconciliation.run_deep().await,
            INVARIANT_AUDIT_JOB => self.reconciliation.validate_invariants().await,
            other => {
                return Err(JobFailure::new(
                    ErrorClass::Validation,
                    format!("Unknown system job {other}"),
                ))
            }
        }
        .map_err(|e| JobFailure::from_error(&e))?;
        self.record(&report);
        Ok(())
    }
}

/// `check-seasons`: close an expired season and open the next.
pub struct SeasonJobHandler {
    integrity: Arc<dyn IntegrityApi>,
}

impl SeasonJobHandler {
    pub fn new(integrity: Arc<dyn IntegrityApi>) -> Self {
        Self { integrity }
    }
}

#[async_trait]
impl JobHandler for SeasonJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobFailure> {
        if job.name != CHECK_SEASONS_JOB {
            return Err(JobFailure::new(
                ErrorClass::Validation,
                format!("Unknown season job {}", job.name),
            ));
        }
        let outcome = self
            .integrity
            .check_seasons()
            .await
            .map_err(|e| JobFailure::from_error(&e))?;
        if outcome.activated.is_some() {
            info!(
                deactivated = ?outcome.deactivated,
                activated = ?outcome.activated,
                halved = outcome.halved,
                "[worker] Season rolled over"
            );
        }
        Ok(())
    }
}
