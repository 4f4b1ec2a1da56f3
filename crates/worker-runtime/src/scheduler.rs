//! # Repeatable Job Scheduler
//!
//! Enqueues the periodic controller, auditor and season jobs. Every worker
//! process runs a scheduler; two guards keep a job from being enqueued once
//! per process:
//!
//! - the tick holds `lock:schedule:{job}` while it decides
//! - the last enqueue time lives in the shared key-value store under
//!   `cortex:schedule:{job}`, and a tick inside the interval is skipped
//!
//! A tick that loses the lock race is skipped, not retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cortex_telemetry::CortexMetrics;
use cx_02_lock_manager::{DistributedLockApi, LockError};
use shared_bus::JobQueue;
use shared_store::KeyValueStore;
use shared_types::Clock;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ScheduledJob;
use crate::error::RuntimeResult;

const SCHEDULE_LOCK_TTL: Duration = Duration::from_secs(30);

/// Lock resource guarding a scheduled job's tick.
pub fn schedule_lock_key(job: &str) -> String {
    format!("lock:schedule:{job}")
}

/// Key holding the last enqueue time of a scheduled job.
pub fn last_run_key(job: &str) -> String {
    format!("cortex:schedule:{job}")
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Enqueued,
    /// Another process enqueued it within the interval.
    NotDue,
    /// Another process held the schedule lock.
    Contended,
}

pub struct Scheduler {
    queue: Arc<dyn JobQueue>,
    locks: Arc<dyn DistributedLockApi>,
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    jobs: Vec<ScheduledJob>,
    metrics: Arc<CortexMetrics>,
}

impl Scheduler {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        locks: Arc<dyn DistributedLockApi>,
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        jobs: Vec<ScheduledJob>,
        metrics: Arc<CortexMetrics>,
    ) -> Self {
        Self {
            queue,
            locks,
            kv,
            clock,
            jobs,
            metrics,
        }
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Enqueue `job` unless another process already did within its interval.
    pub async fn tick(&self, job: &ScheduledJob) -> RuntimeResult<TickOutcome> {
        let guard = match self
            .locks
            .acquire(&[schedule_lock_key(job.job)], SCHEDULE_LOCK_TTL)
            .await
        {
            Ok(guard) => guard,
            Err(LockError::Contention { .. }) => {
                self.metrics
                    .lock_contention_skips
                    .with_label_values(&[job.job])
                    .inc();
                debug!(job = job.job, "[scheduler] Schedule lock held elsewhere");
                return Ok(TickOutcome::Contended);
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = self.enqueue_if_due(job).await;
        guard.release().await;
        outcome
    }

    async fn enqueue_if_due(&self, job: &ScheduledJob) -> RuntimeResult<TickOutcome> {
        let key = last_run_key(job.job);
        let now = self.clock.now();

        if let Some(raw) = self.kv.get(&key).await? {
            match DateTime::parse_from_rfc3339(&raw) {
                Ok(last) if !is_due(last.with_timezone(&Utc), now, job.every) => {
                    return Ok(TickOutcome::NotDue);
                }
                Ok(_) => {}
                Err(e) => warn!(job = job.job, error = %e, "[scheduler] Unreadable last run, enqueueing"),
            }
        }

        let payload = serde_json::Value::Object(serde_json::Map::new());
        let id = self.queue.enqueue(job.queue, job.job, payload).await?;
        self.kv.set(&key, now.to_rfc3339()).await?;
        debug!(job = job.job, queue = job.queue, job_id = %id, "[scheduler] Enqueued");
        Ok(TickOutcome::Enqueued)
    }

    /// Tick every job on its own interval until `shutdown` flips to true.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();
        for job in self.jobs.clone() {
            let scheduler = Arc::clone(&self);
            let mut shutdown = shutdown.clone();
            tasks.spawn(async move {
                let mut interval = tokio::time::interval(job.every);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = scheduler.tick(&job).await {
                                warn!(job = job.job, error = %e, "[scheduler] Tick failed");
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
            });
        }
        info!(jobs = self.jobs.len(), "[scheduler] Started");
        while tasks.join_next().await.is_some() {}
        info!("[scheduler] Stopped");
    }
}

/// Due once 90% of the interval has passed, so jitter between processes
/// does not skip a whole cycle. A last run in the future is never due.
fn is_due(last: DateTime<Utc>, now: DateTime<Utc>, every: Duration) -> bool {
    match (now - last).to_std() {
        Ok(elapsed) => elapsed >= every - every / 10,
        Err(_) => false,
    }
}
