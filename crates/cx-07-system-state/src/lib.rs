//! # cx-07-system-state
//!
//! System State Controller: decides whether the platform accepts writes.
//!
//! ## Evaluation cycle (every 15s)
//!
//! ```text
//! queue broker ──→ max depth, dead letters ─┐
//!                                           ├─→ next_state(current, metrics) ──→ KV record
//! document store ─→ spikes, conflicts,     ─┘           │
//!                   failed payouts (24h)                └─ changed? → transition log + event
//! ```
//!
//! The record lives under `cortex:system_state` in the shared key-value
//! store, so every request-handling process reads the same value through
//! [`SystemStateReader`](shared_types::SystemStateReader) without running
//! the evaluation itself.
//!
//! ## Forced escalation
//!
//! Auditors call [`SystemStateApi::force_critical`] on invariant failures.
//! The escalation is held against the periodic evaluator until an operator
//! releases it.
//!
//! ## Write gate
//!
//! [`WriteGate`] applies the request-gating contract: reads, admin callers
//! and login always pass; other mutations get a `SYSTEM_<STATE>` rejection
//! while the state is not NORMAL.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod gate;
pub mod ports;
pub mod service;

pub use adapters::{JobQueueMetrics, StaticQueueLoad, StoreRiskSignals};
pub use domain::{
    next_state, Access, Decision, GateRejection, GateRequest, HysteresisThresholds, MarkerLevels,
    QueueLoad, RiskSignals,
};
pub use error::{SystemStateError, SystemStateResult};
pub use gate::WriteGate;
pub use ports::inbound::SystemStateApi;
pub use ports::outbound::{QueueMetricsSource, RiskSignalSource};
pub use service::{SystemStateConfig, SystemStateController, SYSTEM_STATE_KEY};
