//! # Job Queue
//!
//! At-least-once named queues.
//!
//! ```text
//! enqueue ──→ waiting ──reserve──→ active ──complete──→ completed
//!                ↑                    │
//!                ├── delayed ←─retry──┤ (transient, attempts left)
//!                └── delayed ←─postpone┤ (attempt not counted)
//!                                     └──────────────→ failed (dead letter)
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Classify, ErrorClass};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::jobs::{
    Backoff, Job, JobCounts, JobFailure, JobId, JobOptions, INTEGRITY_QUEUE, RANKING_QUEUE,
    SEASON_QUEUE, SYSTEM_QUEUE, TOURNAMENT_QUEUE,
};

/// Queue errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    #[error("Queue backend unavailable")]
    Unavailable,
}

impl Classify for QueueError {
    fn class(&self) -> ErrorClass {
        match self {
            QueueError::UnknownQueue(_) => ErrorClass::Validation,
            QueueError::Unavailable => ErrorClass::Transient,
        }
    }
}

/// What happened to a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Scheduled for another attempt after `delay`.
    Retrying { attempt: u32, delay: Duration },
    /// Put back after `delay`; the failed run did not count as an attempt.
    Postponed { delay: Duration },
    /// Retry budget exhausted or failure not retryable.
    DeadLettered,
}

/// Producer and monitoring side of the work queues.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job with the queue's default options.
    async fn enqueue(
        &self,
        queue: &str,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<JobId, QueueError>;

    /// Current job counts of a queue.
    async fn counts(&self, queue: &str) -> Result<JobCounts, QueueError>;
}

struct QueueState {
    options: JobOptions,
    waiting: VecDeque<Job>,
    delayed: Vec<(Instant, Job)>,
    active: HashMap<JobId, Job>,
    completed: u64,
    dead: Vec<Job>,
    notify: Arc<Notify>,
}

impl QueueState {
    fn new(options: JobOptions) -> Self {
        Self {
            options,
            waiting: VecDeque::new(),
            delayed: Vec::new(),
            active: HashMap::new(),
            completed: 0,
            dead: Vec::new(),
            notify: Arc::new(Notify::new()),
        }
    }

    fn promote_due(&mut self, now: Instant) {
        let mut i = 0;
        while i < self.delayed.len() {
            if self.delayed[i].0 <= now {
                let (_, job) = self.delayed.swap_remove(i);
                self.waiting.push_back(job);
            } else {
                i += 1;
            }
        }
    }

    fn counts(&self) -> JobCounts {
        JobCounts {
            waiting: self.waiting.len() as u64,
            active: self.active.len() as u64,
            delayed: self.delayed.len() as u64,
            completed: self.completed,
            failed: self.dead.len() as u64,
        }
    }
}

/// In-memory job queue broker.
pub struct InMemoryJobQueue {
    queues: Mutex<HashMap<String, QueueState>>,
    available: AtomicBool,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Broker with every platform queue declared with its delivery options.
    pub fn with_platform_queues() -> Self {
        let broker = Self::new();
        broker.declare(RANKING_QUEUE, JobOptions::match_processing());
        broker.declare(INTEGRITY_QUEUE, JobOptions::match_processing());
        broker.declare(TOURNAMENT_QUEUE, JobOptions::bracket_advancement());
        broker.declare(SYSTEM_QUEUE, JobOptions::default());
        broker.declare(SEASON_QUEUE, JobOptions::new(1, Backoff::None));
        broker
    }

    /// Declare a queue. Re-declaring keeps existing jobs and updates options.
    pub fn declare(&self, name: &str, options: JobOptions) {
        let mut queues = self.queues.lock();
        queues
            .entry(name.to_string())
            .and_modify(|q| q.options = options)
            .or_insert_with(|| QueueState::new(options));
    }

    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Simulate a broker outage.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), QueueError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(QueueError::Unavailable)
        }
    }

    /// Wake-up handle signalled on every enqueue.
    pub fn notifier(&self, queue: &str) -> Option<Arc<Notify>> {
        self.queues.lock().get(queue).map(|q| Arc::clone(&q.notify))
    }

    /// Take the next ready job, marking it active.
    pub fn reserve(&self, queue: &str) -> Option<Job> {
        if self.check_available().is_err() {
            return None;
        }
        let mut queues = self.queues.lock();
        let state = queues.get_mut(queue)?;
        state.promote_due(Instant::now());
        let mut job = state.waiting.pop_front()?;
        job.attempts_made += 1;
        state.active.insert(job.id, job.clone());
        Some(job)
    }

    /// Mark an active job completed.
    pub fn complete(&self, queue: &str, job: &JobId) {
        let mut queues = self.queues.lock();
        if let Some(state) = queues.get_mut(queue) {
            if state.active.remove(job).is_some() {
                state.completed += 1;
            }
        }
    }

    /// Mark an active job failed, scheduling a retry or dead-lettering it.
    pub fn fail(&self, queue: &str, job: &JobId, failure: &JobFailure) -> FailOutcome {
        let mut queues = self.queues.lock();
        let Some(state) = queues.get_mut(queue) else {
            return FailOutcome::DeadLettered;
        };
        let Some(mut job) = state.active.remove(job) else {
            return FailOutcome::DeadLettered;
        };
        job.last_error = Some(failure.message.clone());

        if let Some(delay) = failure.postpone {
            job.attempts_made = job.attempts_made.saturating_sub(1);
            debug!(
                queue,
                job_id = %job.id,
                job = %job.name,
                delay_ms = delay.as_millis() as u64,
                reason = %failure.message,
                "[bus] Job postponed"
            );
            state.delayed.push((Instant::now() + delay, job));
            return FailOutcome::Postponed { delay };
        }

        if failure.class.is_retryable() && job.attempts_made < state.options.attempts {
            let delay = state.options.backoff.delay(job.attempts_made);
            let attempt = job.attempts_made + 1;
            warn!(
                queue,
                job_id = %job.id,
                job = %job.name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure.message,
                "[bus] Job failed, retry scheduled"
            );
            state.delayed.push((Instant::now() + delay, job));
            FailOutcome::Retrying { attempt, delay }
        } else {
            error!(
                queue,
                job_id = %job.id,
                job = %job.name,
                attempts = job.attempts_made,
                class = ?failure.class,
                error = %failure.message,
                "[bus] Job dead-lettered"
            );
            state.dead.push(job);
            FailOutcome::DeadLettered
        }
    }

    /// Jobs awaiting manual triage.
    pub fn dead_letters(&self, queue: &str) -> Vec<Job> {
        self.queues
            .lock()
            .get(queue)
            .map(|q| q.dead.clone())
            .unwrap_or_default()
    }

    /// Synchronous counts, for callers outside an async context.
    pub fn counts_now(&self, queue: &str) -> Result<JobCounts, QueueError> {
        self.queues
            .lock()
            .get(queue)
            .map(QueueState::counts)
            .ok_or_else(|| QueueError::UnknownQueue(queue.to_string()))
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(
        &self,
        queue: &str,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<JobId, QueueError> {
        self.check_available()?;
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::UnknownQueue(queue.to_string()))?;
        let job = Job::new(name, payload);
        let id = job.id;
        state.waiting.push_back(job);
        state.notify.notify_one();
        debug!(queue, job = name, job_id = %id, "[bus] Job enqueued");
        Ok(id)
    }

    async fn counts(&self, queue: &str) -> Result<JobCounts, QueueError> {
        self.check_available()?;
        self.counts_now(queue)
    }
}
