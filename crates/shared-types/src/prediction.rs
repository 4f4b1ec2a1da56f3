//! Win-probability prediction port.
//!
//! The prediction service is an external collaborator. Callers must treat
//! `None` as "unavailable" and fall back to the Elo formula.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::rating::MatchupFeatures;

/// Response of the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability that `p1` wins, 0..=1.
    pub win_probability: f64,
    pub confidence_score: f64,
    pub predicted_winner: String,
}

impl Prediction {
    pub fn is_valid(&self) -> bool {
        self.win_probability.is_finite() && (0.0..=1.0).contains(&self.win_probability)
    }
}

/// Driven port for the win-probability service.
///
/// Implementations enforce their own timeout and map every failure
/// (non-2xx, timeout, malformed body) to `None`.
#[async_trait]
pub trait PredictionProvider: Send + Sync {
    async fn predict(&self, features: &MatchupFeatures) -> Option<Prediction>;
}

/// Provider that is always unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailablePredictor;

#[async_trait]
impl PredictionProvider for UnavailablePredictor {
    async fn predict(&self, _features: &MatchupFeatures) -> Option<Prediction> {
        None
    }
}

/// Provider returning a fixed probability for `p1`.
#[derive(Debug, Clone, Copy)]
pub struct FixedPredictor {
    pub win_probability: f64,
}

impl FixedPredictor {
    pub fn new(win_probability: f64) -> Self {
        Self { win_probability }
    }
}

#[async_trait]
impl PredictionProvider for FixedPredictor {
    async fn predict(&self, _features: &MatchupFeatures) -> Option<Prediction> {
        Some(Prediction {
            win_probability: self.win_probability,
            confidence_score: 1.0,
            predicted_winner: if self.win_probability >= 0.5 { "p1" } else { "p2" }.to_string(),
        })
    }
}
