//! # cx-06-integrity
//!
//! Integrity Analyzer: scores suspicious win patterns per completed match.
//!
//! ## Per match
//!
//! ```text
//! decay both sides ──→ streak bookkeeping ──→ anomaly rules ──→ ┬─ delta > 0: add, flag > 50, log
//!                                                              └─ expected win (> 70%): -2, unflag
//! ```
//!
//! | rule | delta |
//! |------|-------|
//! | win chance < 20% | +20 |
//! | win chance 20-35% | +10 |
//! | streak > 10 | +15 |
//! | streak > 5 and win chance < 40% | +20 |
//!
//! Decay: once 7 days have passed since the last increase, the score loses
//! 5% per full 7-day period since the last decay, compounding.
//!
//! The whole analysis of a match commits in one transaction together with an
//! integrity-scope ledger fence per participant, so redelivered jobs change
//! nothing.
//!
//! ## Season rollover
//!
//! When the active season ends, the next season whose window contains now is
//! activated and every positive score is halved.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{AnomalyRules, Assessment, IntegrityOutcome, ProbabilitySource, RolloverOutcome};
pub use error::{IntegrityError, IntegrityResult};
pub use ports::inbound::IntegrityApi;
pub use service::{IntegrityConfig, IntegrityService};
