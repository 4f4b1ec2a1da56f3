//! Domain module for the Ranking Processor
//!
//! - elo: pure rating math
//! - outcome: what a processing run changed

pub mod elo;
pub mod outcome;

pub use elo::{duel_deltas, margin_multiplier, placement_delta, placement_score};
pub use outcome::{ExpectationSource, ParticipantDelta, RankingOutcome};
