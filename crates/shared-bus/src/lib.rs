//! # Shared Bus - Work Queues and Notifications
//!
//! Two delivery mechanisms used by the consistency core:
//!
//! - **Work queues** ([`JobQueue`], [`Worker`]): named durable queues with
//!   at-least-once delivery, exponential backoff and dead-lettering. Every
//!   match-completion fans out into three jobs consumed independently.
//! - **Notification bus** ([`EventPublisher`]): fire-and-forget broadcast of
//!   platform events (bracket advanced, tournament completed) to whatever
//!   delivery layer is attached.
//!
//! ```text
//! confirm result ──enqueue──→ ┌──────────────┐   reserve    ┌──────────┐
//!                             │  ranking     │ ───────────→ │  Worker  │──→ handler
//!                             │  integrity   │ ←─────────── │ (N slots)│
//!                             │  tournament  │ retry / DLQ  └──────────┘
//!                             └──────────────┘
//! ```
//!
//! Jobs carry small JSON payloads (`{"matchId": ...}`); handlers must be
//! idempotent because any job may run more than once.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod jobs;
pub mod publisher;
pub mod queue;
pub mod subscriber;
pub mod worker;

pub use events::PlatformEvent;
pub use jobs::{
    Backoff, Job, JobCounts, JobFailure, JobId, JobOptions, MatchJobPayload, CHECK_SEASONS_JOB,
    DEEP_AUDIT_JOB, EVALUATE_STATE_JOB, INTEGRITY_ANALYSIS_JOB, INTEGRITY_QUEUE,
    INVARIANT_AUDIT_JOB, LIGHT_AUDIT_JOB, MAX_ATTEMPTS, MONITORED_QUEUES, RANKING_QUEUE,
    RANK_UPDATE_JOB, SEASON_QUEUE, SYSTEM_QUEUE, TOURNAMENT_ADVANCEMENT_JOB, TOURNAMENT_QUEUE,
};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use queue::{FailOutcome, InMemoryJobQueue, JobQueue, QueueError};
pub use subscriber::Subscription;
pub use worker::{JobHandler, Worker, WorkerConfig};

/// Maximum notifications buffered per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
