//! Domain module for the System State Controller
//!
//! - hysteresis: the pure transition function and its thresholds
//! - gate: which requests a non-NORMAL state rejects

pub mod gate;
pub mod hysteresis;

pub use gate::{evaluate_request, Access, GateRejection, GateRequest};
pub use hysteresis::{
    next_state, static_marker, Decision, HysteresisThresholds, Marker, MarkerLevels,
};

use serde::{Deserialize, Serialize};

/// Queue-side inputs of an evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueLoad {
    pub max_depth: u64,
    pub total_failed: u64,
}

/// Store-side risk counters over the risk window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskSignals {
    pub suspicion_spike: u64,
    pub ledger_conflicts: u64,
    pub failed_payouts: u64,
}
