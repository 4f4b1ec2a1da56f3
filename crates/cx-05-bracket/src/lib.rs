//! # cx-05-bracket
//!
//! Bracket Automator: advances single-elimination tournaments as matches
//! complete.
//!
//! ## Round state machine
//!
//! ```text
//! round in progress ──all matches completed──→ ┬─ one match:   finalize (badge, +100, payout)
//!                                             └─ more matches: pair winners into round+1
//! ```
//!
//! The bracket is the flat list of a tournament's matches keyed by `round`.
//! Pairing follows `bracket_position` of the finished round, never
//! re-seeded. An odd winner gets a bye: a match created already completed.
//!
//! ## Concurrency
//!
//! Every advancement runs under `lock:tournament:{id}` (5 s lease). A busy
//! lock means another worker is advancing the same tournament and the
//! invocation is dropped; the next completion event re-checks the round.
//! Byes that complete a round instantly are followed with a work-list inside
//! the same critical section instead of re-acquiring the lock.
//!
//! Finalization is safe to repeat: the status flip runs once and the payout
//! is idempotent in escrow.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{EscrowDisbursement, MockDisbursement, RecordingNotifier};
pub use domain::{pair_in_order, AdvanceOutcome, AdvanceStep, SeedOutcome, Slot};
pub use error::{BracketError, BracketResult};
pub use ports::inbound::BracketApi;
pub use ports::outbound::PrizeDisbursement;
pub use service::{tournament_lock_key, BracketConfig, BracketService};
