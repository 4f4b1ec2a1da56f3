//! # cx-04-escrow
//!
//! Escrow Ledger: every CRX balance movement on the platform.
//!
//! ## Atomic unit
//!
//! ```text
//! transaction {
//!     read balance ──→ cap / funds / 24h-limit checks ──violation──→ abort (typed error)
//!          │ ok
//!          ▼
//!     write balance + insert Transaction record
//! }
//! ```
//!
//! Nothing is persisted on a rejected movement. Two kinds of failed attempts
//! are written afterwards as `status = failed` records, outside the aborted
//! transaction: payouts that could not be made and reused idempotency keys.
//! The system-state controller counts both as risk signals.
//!
//! ## Payout idempotency
//!
//! At most one completed `prize_payout` exists per tournament (unique index in
//! the store). A second finalization finds it and returns `already_paid`.
//! Payouts are refused while the platform is CRITICAL.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{entry_fee_key, CreditReceipt, DebitReceipt, PayoutReceipt};
pub use error::{EscrowError, EscrowResult};
pub use ports::inbound::EscrowApi;
pub use service::{EscrowConfig, EscrowService};
