//! # cx-01-idempotency-ledger
//!
//! At-most-once guard for job side effects.
//!
//! ## Overview
//!
//! A ledger entry is a fence `(scope, subject, event)` backed by a
//! compound-unique index. Inserting the fence in the **same transaction** as
//! the effect it guards closes the check-then-apply gap:
//!
//! ```text
//! transaction {
//!     record_once(scope, competitor, match) ──created=false──→ skip (already applied)
//!          │ created=true
//!          ▼
//!     apply rating / suspicion delta
//! }
//! ```
//!
//! A unique-index hit is never an error: it means a previous delivery of the
//! same job already applied the effect. Any other storage failure propagates
//! so the job is retried.
//!
//! ## Scopes
//!
//! | scope | subject | event |
//! |-------|---------|-------|
//! | `ranking` | competitor | match |
//! | `integrity` | competitor | match |

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::MockFenceWriter;
pub use domain::{LedgerEntry, LedgerScope, RecordOutcome};
pub use error::{LedgerError, LedgerResult};
pub use ports::inbound::IdempotencyLedgerApi;
pub use ports::outbound::FenceWriter;
pub use service::IdempotencyLedger;
