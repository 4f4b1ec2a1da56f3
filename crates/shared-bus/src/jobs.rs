//! # Jobs
//!
//! Queue and job names, delivery options and the failure type handlers
//! report back to the queue.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::{Classify, ErrorClass, MatchId};
use uuid::Uuid;

// =============================================================================
// QUEUE AND JOB NAMES
// =============================================================================

/// Rating updates, one job per confirmed match.
pub const RANKING_QUEUE: &str = "ranking-updates";
/// Integrity analysis, one job per confirmed match.
pub const INTEGRITY_QUEUE: &str = "integrity-analysis";
/// Bracket advancement, one job per confirmed tournament match.
pub const TOURNAMENT_QUEUE: &str = "tournament-advancement";
/// Periodic controller and auditor jobs.
pub const SYSTEM_QUEUE: &str = "system-state";
/// Periodic season rollover check.
pub const SEASON_QUEUE: &str = "season-rollover";

/// Queues whose depth and failures feed the system-state controller.
pub const MONITORED_QUEUES: [&str; 4] = [
    RANKING_QUEUE,
    INTEGRITY_QUEUE,
    TOURNAMENT_QUEUE,
    SEASON_QUEUE,
];

pub const RANK_UPDATE_JOB: &str = "rank-update";
pub const INTEGRITY_ANALYSIS_JOB: &str = "integrity-analysis";
pub const TOURNAMENT_ADVANCEMENT_JOB: &str = "tournament-advancement";
pub const EVALUATE_STATE_JOB: &str = "evaluate-state";
pub const INVARIANT_AUDIT_JOB: &str = "invariant-audit";
pub const LIGHT_AUDIT_JOB: &str = "economy-audit-light";
pub const DEEP_AUDIT_JOB: &str = "economy-audit-deep";
pub const CHECK_SEASONS_JOB: &str = "check-seasons";

/// Absolute ceiling on delivery attempts for any job.
pub const MAX_ATTEMPTS: u32 = 5;

// =============================================================================
// JOB
// =============================================================================

/// Job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Retry delay policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// `base * 2^(attempt - 1)` after the n-th failed attempt.
    Exponential { base: Duration },
}

impl Backoff {
    /// Delay before the next attempt, given how many attempts already failed.
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Exponential { base } => {
                let exp = failed_attempts.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << exp)
            }
        }
    }
}

/// Delivery options of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    pub attempts: u32,
    pub backoff: Backoff,
}

impl JobOptions {
    /// Options clamped to `1..=MAX_ATTEMPTS` attempts.
    pub fn new(attempts: u32, backoff: Backoff) -> Self {
        Self {
            attempts: attempts.clamp(1, MAX_ATTEMPTS),
            backoff,
        }
    }

    /// 3 attempts, exponential from 1s (ranking, integrity).
    pub fn match_processing() -> Self {
        Self::new(
            3,
            Backoff::Exponential {
                base: Duration::from_secs(1),
            },
        )
    }

    /// 5 attempts, exponential from 2s (bracket advancement).
    pub fn bracket_advancement() -> Self {
        Self::new(
            5,
            Backoff::Exponential {
                base: Duration::from_secs(2),
            },
        )
    }
}

impl Default for JobOptions {
    fn default() -> Self {
        Self::new(1, Backoff::None)
    }
}

/// A unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub payload: serde_json::Value,
    /// Attempts already started, including the current one once reserved.
    pub attempts_made: u32,
    pub last_error: Option<String>,
}

impl Job {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: JobId::new(),
            name: name.into(),
            payload,
            attempts_made: 0,
            last_error: None,
        }
    }

    /// Decode the payload into a typed value.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, JobFailure> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            JobFailure::new(
                ErrorClass::Validation,
                format!("Malformed payload for {}: {}", self.name, e),
            )
        })
    }
}

/// Payload of every match-completion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchJobPayload {
    pub match_id: MatchId,
}

/// Snapshot of a queue's job counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobCounts {
    pub waiting: u64,
    pub active: u64,
    pub delayed: u64,
    pub completed: u64,
    /// Dead-lettered jobs.
    pub failed: u64,
}

impl JobCounts {
    /// Jobs not yet finished.
    pub fn depth(&self) -> u64 {
        self.waiting + self.active + self.delayed
    }
}

// =============================================================================
// FAILURE
// =============================================================================

/// Failure reported by a job handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub class: ErrorClass,
    pub message: String,
    /// Run the job again after this delay without spending an attempt.
    pub postpone: Option<Duration>,
}

impl JobFailure {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            postpone: None,
        }
    }

    /// Wrap any classified error.
    pub fn from_error<E: Classify + fmt::Display>(error: &E) -> Self {
        Self::new(error.class(), error.to_string())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Transient, message)
    }

    /// The job could not run yet (a busy lock, a payout freeze). It goes back
    /// to the queue after `delay` with its attempt budget untouched.
    pub fn postponed(delay: Duration, message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Contention,
            message: message.into(),
            postpone: Some(delay),
        }
    }

    pub fn is_postponed(&self) -> bool {
        self.postpone.is_some()
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.class, self.message)
    }
}
