use serde::{Deserialize, Serialize};
use shared_types::{MatchId, SeasonId, UserId};

/// Where the winner's probability came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbabilitySource {
    Prediction,
    EloFallback,
}

/// Result of analyzing one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityOutcome {
    pub match_id: MatchId,
    pub winner: Option<UserId>,
    pub win_probability: Option<f64>,
    pub source: Option<ProbabilitySource>,
    /// Suspicion change of the winner, decay excluded.
    pub delta: f64,
    pub reasons: Vec<String>,
    pub flagged: bool,
    pub unflagged: bool,
    /// Already analyzed, or nothing to analyze (bye, no winner).
    pub skipped: bool,
}

impl IntegrityOutcome {
    pub fn skipped(match_id: MatchId) -> Self {
        Self {
            match_id,
            winner: None,
            win_probability: None,
            source: None,
            delta: 0.0,
            reasons: Vec::new(),
            flagged: false,
            unflagged: false,
            skipped: true,
        }
    }
}

/// Result of a season check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverOutcome {
    pub deactivated: Option<SeasonId>,
    pub activated: Option<SeasonId>,
    /// Competitors whose score was halved.
    pub halved: usize,
    pub unflagged: usize,
}
