//! Processing outcome

use serde::Serialize;
use shared_types::{MatchId, UserId};

/// Where the expected score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectationSource {
    Prediction,
    EloFallback,
    LobbyAverage,
}

/// Rating change applied to one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParticipantDelta {
    pub user: UserId,
    pub delta: i64,
    /// Per-game rating after the change.
    pub new_rating: i64,
    pub is_win: bool,
}

/// Result of one `process_match` run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingOutcome {
    pub match_id: MatchId,
    pub applied: Vec<ParticipantDelta>,
    /// Participants whose update was already applied by an earlier run.
    pub skipped: Vec<UserId>,
    pub source: Option<ExpectationSource>,
}

impl RankingOutcome {
    pub fn new(match_id: MatchId) -> Self {
        Self {
            match_id,
            applied: Vec::new(),
            skipped: Vec::new(),
            source: None,
        }
    }

    /// Nothing was written by this run.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}
