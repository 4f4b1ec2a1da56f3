//! Job handlers, one per queue.
//!
//! | Queue                    | Handler                 | Jobs                              |
//! |--------------------------|-------------------------|-----------------------------------|
//! | `ranking-updates`        | [`RankingJobHandler`]   | `rank-update`                     |
//! | `integrity-analysis`     | [`IntegrityJobHandler`] | `integrity-analysis`              |
//! | `tournament-advancement` | [`TournamentJobHandler`]| `tournament-advancement`          |
//! | `system-state`           | [`SystemJobHandler`]    | `evaluate-state`, audits          |
//! | `season-rollover`        | [`SeasonJobHandler`]    | `check-seasons`                   |
//!
//! Each is wrapped in [`Metered`] by the container.

pub mod match_jobs;
pub mod metered;
pub mod periodic;

pub use match_jobs::{IntegrityJobHandler, RankingJobHandler, TournamentJobHandler};
pub use metered::Metered;
pub use periodic::{SeasonJobHandler, SystemJobHandler};
