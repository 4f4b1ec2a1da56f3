//! Handler decorator recording job outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use cortex_telemetry::CortexMetrics;
use shared_bus::{Job, JobFailure, JobHandler, JobOptions};

/// Wraps a queue's handler to count job outcomes.
///
/// A failure is counted as dead-lettered when the queue will not retry it:
/// the class is not retryable or the attempt budget is spent. Postponed jobs
/// never spend budget and are counted apart.
pub struct Metered {
    queue: &'static str,
    options: JobOptions,
    inner: Arc<dyn JobHandler>,
    metrics: Arc<CortexMetrics>,
}

impl Metered {
    pub fn new(
        queue: &'static str,
        options: JobOptions,
        inner: Arc<dyn JobHandler>,
        metrics: Arc<CortexMetrics>,
    ) -> Self {
        Self {
            queue,
            options,
            inner,
            metrics,
        }
    }
}

#[async_trait]
impl JobHandler for Metered {
    async fn handle(&self, job: &Job) -> Result<(), JobFailure> {
        let result = self.inner.handle(job).await;
        match &result {
            Ok(()) => self.metrics.job_done(self.queue, "completed"),
            Err(failure) if failure.is_postponed() => {
                self.metrics.job_done(self.queue, "postponed");
            }
            Err(failure)
                if failure.class.is_retryable() && job.attempts_made < self.options.attempts =>
            {
                self.metrics.job_done(self.queue, "retried");
            }
            Err(_) => {
                self.metrics.job_done(self.queue, "dead_lettered");
                self.metrics
                    .dead_lettered
                    .with_label_values(&[self.queue])
                    .inc();
            }
        }
        result
    }
}
