//! Elo helpers and prediction feature construction.
//!
//! Ranking and integrity analysis must build identical features for the
//! prediction service, so both go through [`MatchupFeatures::from_stats`].

use serde::{Deserialize, Serialize};

use crate::entities::StatRecord;

/// Logistic Elo expectation of `rating` scoring against `opponent`.
///
/// `E = 1 / (1 + 10^((opponent - rating) / 400))`
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// Round to the nearest integer, halves toward positive infinity.
///
/// Rating deltas use this so `-7.5` becomes `-7` and `7.5` becomes `8`.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Request body of the win-probability service. `p1` is the competitor
/// whose win probability is returned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchupFeatures {
    pub p1_rating: f64,
    pub p2_rating: f64,
    pub p1_win_rate: f64,
    pub p2_win_rate: f64,
}

impl MatchupFeatures {
    pub fn from_stats(p1: &StatRecord, p2: &StatRecord) -> Self {
        Self {
            p1_rating: p1.rating_points as f64,
            p2_rating: p2.rating_points as f64,
            p1_win_rate: p1.win_rate(),
            p2_win_rate: p2.win_rate(),
        }
    }

    /// Formula fallback for `p1`'s win probability.
    pub fn elo_expectation(&self) -> f64 {
        expected_score(self.p1_rating, self.p2_rating)
    }
}
