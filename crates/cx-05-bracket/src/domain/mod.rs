//! Domain module for the Bracket Automator
//!
//! - pairing: stable slot assignment for a round
//! - outcome: what an advancement or seeding run did

pub mod outcome;
pub mod pairing;

pub use outcome::{AdvanceOutcome, AdvanceStep, SeedOutcome};
pub use pairing::{pair_in_order, Slot};
