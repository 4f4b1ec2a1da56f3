//! # cx-08-reconciliation
//!
//! Reconciliation Auditors: periodic detection of economic and production
//! invariant violations.
//!
//! | audit | cadence | checks |
//! |-------|---------|--------|
//! | light | 6h | supply conservation, orphaned transactions (first 10k), duplicate tournament bindings |
//! | deep | daily | light checks over every transaction, per-user wallet equals own history |
//! | invariant | daily | no negative wallet or rating, no duplicate participant, state evaluated within 5 min |
//!
//! Any failure, including an audit that cannot read the store, forces the
//! platform into CRITICAL through [`CriticalEscalation`] and returns the full
//! failure set in the [`AuditReport`]. Audits never repair data.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{ControllerEscalation, Escalation, RecordingEscalation};
pub use domain::{
    AuditFindings, AuditKind, AuditReport, DuplicateBinding, EconomyFindings, InvariantFindings,
    SupplySnapshot, WalletMismatch,
};
pub use error::{ReconciliationError, ReconciliationResult};
pub use ports::inbound::ReconciliationApi;
pub use ports::outbound::CriticalEscalation;
pub use service::{ReconciliationConfig, ReconciliationService};
