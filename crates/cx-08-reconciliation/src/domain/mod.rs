//! Domain module for the Reconciliation Auditors
//!
//! Checks are pure functions over a consistent read of the store. They
//! detect and report; nothing here repairs data.

pub mod economy;
pub mod invariants;

pub use economy::{scan_economy, DuplicateBinding, EconomyFindings, SupplySnapshot, WalletMismatch};
pub use invariants::{scan_invariants, InvariantFindings};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which auditor produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    Light,
    Deep,
    Invariant,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditKind::Light => "LIGHT",
            AuditKind::Deep => "DEEP",
            AuditKind::Invariant => "INVARIANT",
        }
    }

    /// Escalation source recorded with a forced CRITICAL.
    pub fn source(self) -> &'static str {
        match self {
            AuditKind::Light => "economy-audit-light",
            AuditKind::Deep => "economy-audit-deep",
            AuditKind::Invariant => "invariant-audit",
        }
    }
}

/// What an audit found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum AuditFindings {
    Economy(EconomyFindings),
    Invariants(InvariantFindings),
    /// The audit could not read the data it checks.
    Crashed { error: String },
}

/// Result of one audit run, surfaced to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub kind: AuditKind,
    pub passed: bool,
    pub failures: Vec<String>,
    pub findings: AuditFindings,
    /// Whether this run forced the platform into CRITICAL.
    pub escalated: bool,
    pub checked_at: DateTime<Utc>,
}
