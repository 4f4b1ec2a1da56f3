//! # Shared Types Crate
//!
//! Domain entities and cross-subsystem contracts for the Cortex Clash
//! consistency core.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every entity mutated by more than one
//!   subsystem (competitor wallet, rating, integrity record) is defined here.
//! - **Typed maps, no blobs**: per-game and per-season statistics are
//!   `BTreeMap<Id, StatRecord>` with a fixed record shape.
//! - **Injected collaborators**: time (`Clock`), prediction
//!   (`PredictionProvider`) and system state (`SystemStateReader`) are traits
//!   handed to each service constructor, never globals.

pub mod chaos;
pub mod clock;
pub mod entities;
pub mod errors;
pub mod prediction;
pub mod rating;
pub mod system_state;

pub use chaos::{FaultInjector, InjectedFault};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entities::*;
pub use errors::*;
pub use prediction::{FixedPredictor, Prediction, PredictionProvider, UnavailablePredictor};
pub use rating::{expected_score, round_half_up, MatchupFeatures};
pub use system_state::*;
