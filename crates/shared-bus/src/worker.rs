//! # Worker
//!
//! Bounded-parallel consumer of one queue. Each reserved job runs in its own
//! task; at most `concurrency` jobs are in flight. Handler failures go back
//! to the queue, which decides between retry and dead letter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info};

use crate::jobs::{Job, JobFailure};
use crate::queue::{FailOutcome, InMemoryJobQueue};

/// Processes jobs of one queue. Must be idempotent.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), JobFailure>;
}

/// Worker tuning.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Max jobs processed in parallel.
    pub concurrency: usize,
    /// How often delayed jobs are re-checked when nothing is signalled.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Consumer loop for one queue.
pub struct Worker {
    queue_name: String,
    broker: Arc<InMemoryJobQueue>,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        queue_name: impl Into<String>,
        broker: Arc<InMemoryJobQueue>,
        handler: Arc<dyn JobHandler>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            broker,
            handler,
            config,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Reserve and run one job inline. Returns `None` if nothing was ready.
    pub async fn process_next(&self) -> Option<Result<(), FailOutcome>> {
        let job = self.broker.reserve(&self.queue_name)?;
        Some(self.execute(job).await)
    }

    async fn execute(&self, job: Job) -> Result<(), FailOutcome> {
        debug!(
            queue = %self.queue_name,
            job_id = %job.id,
            job = %job.name,
            attempt = job.attempts_made,
            "[bus] Job started"
        );
        match self.handler.handle(&job).await {
            Ok(()) => {
                self.broker.complete(&self.queue_name, &job.id);
                debug!(queue = %self.queue_name, job_id = %job.id, "[bus] Job completed");
                Ok(())
            }
            Err(failure) => Err(self.broker.fail(&self.queue_name, &job.id, &failure)),
        }
    }

    /// Consume until `shutdown` flips to true, then wait for in-flight jobs.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let Some(notify) = self.broker.notifier(&self.queue_name) else {
            info!(queue = %self.queue_name, "[bus] Queue not declared, worker exiting");
            return;
        };
        let concurrency = self.config.concurrency.max(1);
        let slots = Arc::new(Semaphore::new(concurrency));
        info!(queue = %self.queue_name, concurrency, "[bus] Worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let permit = tokio::select! {
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => break,
            };

            match self.broker.reserve(&self.queue_name) {
                Some(job) => {
                    let worker = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _ = worker.execute(job).await;
                        drop(permit);
                    });
                }
                None => {
                    drop(permit);
                    tokio::select! {
                        _ = notify.notified() => {}
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        // Drain: every slot free means no job in flight.
        let _ = slots.acquire_many(concurrency as u32).await;
        info!(queue = %self.queue_name, "[bus] Worker stopped");
    }
}
