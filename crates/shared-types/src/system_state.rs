//! Platform write-capability state.
//!
//! ```text
//! [NORMAL] ⇄ [DEGRADED] ⇄ [CRITICAL]
//! ```
//!
//! The record lives in the fast key-value store so every process reads the
//! same value. Only the state controller (and forced escalations) write it.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Operating mode of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStateKind {
    #[default]
    Normal,
    Degraded,
    Critical,
}

impl SystemStateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemStateKind::Normal => "NORMAL",
            SystemStateKind::Degraded => "DEGRADED",
            SystemStateKind::Critical => "CRITICAL",
        }
    }

    /// Numeric level for gauges: 0, 1, 2.
    pub fn level(self) -> i64 {
        match self {
            SystemStateKind::Normal => 0,
            SystemStateKind::Degraded => 1,
            SystemStateKind::Critical => 2,
        }
    }
}

impl fmt::Display for SystemStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of one evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Max of waiting + active + delayed across all work queues.
    pub max_queue_depth: u64,
    /// Sum of dead-lettered jobs across queues.
    pub total_failed_jobs: u64,
    /// Accounts over the suspicion threshold whose score rose in the window.
    pub suspicion_spike: u64,
    /// Duplicate / idempotency-rejected transactions in the window.
    pub ledger_conflicts: u64,
    /// Failed payout attempts in the window.
    pub failed_payouts: u64,
}

/// Metrics attached to a state record or transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateSnapshot {
    /// Produced by the periodic evaluator.
    Evaluated(RiskMetrics),
    /// Produced by a forced escalation (auditor failure set).
    Escalation { source: String, details: Vec<String> },
}

/// Singleton system-state record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub state: SystemStateKind,
    pub reason: String,
    pub last_checked: DateTime<Utc>,
    pub snapshot: Option<StateSnapshot>,
}

impl SystemState {
    /// Record used when nothing has been persisted yet.
    pub fn initial(at: DateTime<Utc>) -> Self {
        Self {
            state: SystemStateKind::Normal,
            reason: "System initialized".to_string(),
            last_checked: at,
            snapshot: None,
        }
    }

    pub fn is_normal(&self) -> bool {
        self.state == SystemStateKind::Normal
    }

    pub fn is_critical(&self) -> bool {
        self.state == SystemStateKind::Critical
    }
}

/// Immutable audit entry for a state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub previous: SystemStateKind,
    pub next: SystemStateKind,
    pub trigger: String,
    pub snapshot: StateSnapshot,
    pub at: DateTime<Utc>,
}

/// Read side of the system state, consumed by escrow and the write gate.
#[async_trait]
pub trait SystemStateReader: Send + Sync {
    async fn current_state(&self) -> SystemState;
}

/// Fixed-state reader for tests.
#[derive(Debug)]
pub struct StaticStateReader {
    state: RwLock<SystemStateKind>,
}

impl StaticStateReader {
    pub fn new(state: SystemStateKind) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn set(&self, state: SystemStateKind) {
        *self.state.write() = state;
    }
}

impl Default for StaticStateReader {
    fn default() -> Self {
        Self::new(SystemStateKind::Normal)
    }
}

#[async_trait]
impl SystemStateReader for StaticStateReader {
    async fn current_state(&self) -> SystemState {
        SystemState {
            state: *self.state.read(),
            reason: "static".to_string(),
            last_checked: Utc::now(),
            snapshot: None,
        }
    }
}
