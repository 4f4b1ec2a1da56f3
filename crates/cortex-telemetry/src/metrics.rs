//! Prometheus metrics for the consistency core.
//!
//! The process-wide registry lives in [`REGISTRY`]. Collectors are created
//! through [`CortexMetrics::register`] and handed to the workers that record
//! them, so tests can use a private registry.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Process-wide registry scraped from the metrics endpoint.
    pub static ref REGISTRY: Registry =
        Registry::new_custom(Some("cortex".to_string()), None).unwrap_or_else(|_| Registry::new());
}

/// Collectors recorded by the worker process.
#[derive(Clone)]
pub struct CortexMetrics {
    /// Rating updates, by outcome (applied, skipped).
    pub rating_updates: IntCounterVec,
    /// Deliveries dropped by the idempotency ledger, by job.
    pub ledger_skips: IntCounterVec,
    /// Prize payouts written.
    pub prize_payouts: IntCounter,
    /// Escrow rejections, by error code.
    pub escrow_rejections: IntCounterVec,
    /// System state transitions, by target state.
    pub state_transitions: IntCounterVec,
    /// Current system state (0 normal, 1 degraded, 2 critical).
    pub system_state: IntGauge,
    /// Deepest monitored queue at the last evaluation.
    pub max_queue_depth: IntGauge,
    /// Failed jobs across monitored queues at the last evaluation.
    pub failed_jobs: IntGauge,
    /// Jobs moved to a dead letter queue, by queue.
    pub dead_lettered: IntCounterVec,
    /// Scheduled runs skipped because another worker held the lock.
    pub lock_contention_skips: IntCounterVec,
    /// Audits that reported a failure, by audit kind.
    pub audit_failures: IntCounterVec,
    /// Jobs handled, by queue and outcome.
    pub jobs_processed: IntCounterVec,
}

impl CortexMetrics {
    /// Create all collectors and register them with `registry`.
    pub fn register(registry: &Registry) -> Result<Self, TelemetryError> {
        let metrics = Self {
            rating_updates: IntCounterVec::new(
                Opts::new("rating_updates_total", "Rating updates by outcome"),
                &["outcome"],
            )?,
            ledger_skips: IntCounterVec::new(
                Opts::new("ledger_skips_total", "Deliveries skipped as already processed"),
                &["job"],
            )?,
            prize_payouts: IntCounter::new("prize_payouts_total", "Prize payouts written")?,
            escrow_rejections: IntCounterVec::new(
                Opts::new("escrow_rejections_total", "Escrow operations rejected"),
                &["code"],
            )?,
            state_transitions: IntCounterVec::new(
                Opts::new("state_transitions_total", "System state transitions"),
                &["next"],
            )?,
            system_state: IntGauge::new("system_state", "Current system state level")?,
            max_queue_depth: IntGauge::new("max_queue_depth", "Deepest monitored queue")?,
            failed_jobs: IntGauge::new("failed_jobs", "Failed jobs across monitored queues")?,
            dead_lettered: IntCounterVec::new(
                Opts::new("dead_lettered_total", "Jobs moved to a dead letter queue"),
                &["queue"],
            )?,
            lock_contention_skips: IntCounterVec::new(
                Opts::new("lock_contention_skips_total", "Runs skipped on a held lock"),
                &["task"],
            )?,
            audit_failures: IntCounterVec::new(
                Opts::new("audit_failures_total", "Audits that reported failures"),
                &["kind"],
            )?,
            jobs_processed: IntCounterVec::new(
                Opts::new("jobs_processed_total", "Jobs handled by this process"),
                &["queue", "outcome"],
            )?,
        };

        registry.register(Box::new(metrics.rating_updates.clone()))?;
        registry.register(Box::new(metrics.ledger_skips.clone()))?;
        registry.register(Box::new(metrics.prize_payouts.clone()))?;
        registry.register(Box::new(metrics.escrow_rejections.clone()))?;
        registry.register(Box::new(metrics.state_transitions.clone()))?;
        registry.register(Box::new(metrics.system_state.clone()))?;
        registry.register(Box::new(metrics.max_queue_depth.clone()))?;
        registry.register(Box::new(metrics.failed_jobs.clone()))?;
        registry.register(Box::new(metrics.dead_lettered.clone()))?;
        registry.register(Box::new(metrics.lock_contention_skips.clone()))?;
        registry.register(Box::new(metrics.audit_failures.clone()))?;
        registry.register(Box::new(metrics.jobs_processed.clone()))?;

        Ok(metrics)
    }

    /// Record a state evaluation result.
    pub fn observe_state(&self, level: i64, max_depth: u64, failed: u64) {
        self.system_state.set(level);
        self.max_queue_depth.set(max_depth as i64);
        self.failed_jobs.set(failed as i64);
    }

    /// Record a completed job.
    pub fn job_done(&self, queue: &str, outcome: &str) {
        self.jobs_processed.with_label_values(&[queue, outcome]).inc();
    }
}

/// Encode all metrics in `registry` in the Prometheus text format.
pub fn encode_metrics(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}
