//! Driving Ports (API - Inbound)

use async_trait::async_trait;
use shared_types::MatchId;

use crate::domain::RankingOutcome;
use crate::error::RankingResult;

/// Primary Ranking API.
#[async_trait]
pub trait RankingApi: Send + Sync {
    /// Apply the rating changes of a completed match.
    ///
    /// Safe to call any number of times: participants already updated for
    /// this match are reported in `skipped` and left untouched.
    async fn process_match(&self, match_id: MatchId) -> RankingResult<RankingOutcome>;
}
