//! # cx-03-ranking
//!
//! Ranking Processor: applies rating changes for a confirmed match exactly
//! once per (participant, match).
//!
//! ## Dispatch
//!
//! ```text
//! rank-update {matchId}
//!      │
//!      ├── points-based, >2 players ──→ placement Elo (K=40), one transaction per player
//!      │
//!      └── otherwise ─────────────────→ duel Elo (K=32·margin), one transaction for both
//! ```
//!
//! ## Duel
//!
//! `R' = R + K·(S - E)`. `E` comes from the prediction service when it
//! answers in time, else from the logistic formula. Round-based games scale
//! `K` by `1 + diff/26`, capped.
//!
//! ## Placement
//!
//! Actual score is `(N - rank)/(N - 1)`; expected score compares the player's
//! rating with the lobby average. Each player is fenced independently, so a
//! crash after player 3 of 8 resumes at player 4 on retry.
//!
//! Every write goes through the idempotency ledger in the same transaction.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{ExpectationSource, ParticipantDelta, RankingOutcome};
pub use error::{RankingError, RankingResult};
pub use ports::inbound::RankingApi;
pub use service::{RankingConfig, RankingService};
