//! Domain module for the Integrity Analyzer
//!
//! - anomaly: additive suspicion rules
//! - decay: time-based score relief
//! - outcome: what an analysis or rollover changed

pub mod anomaly;
pub mod decay;
pub mod outcome;

pub use anomaly::{AnomalyRules, Assessment};
pub use decay::{apply_decay, round2};
pub use outcome::{IntegrityOutcome, ProbabilitySource, RolloverOutcome};
