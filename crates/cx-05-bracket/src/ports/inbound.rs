//! Driving Ports (API - Inbound)

use async_trait::async_trait;
use shared_types::{MatchId, TournamentId};

use crate::domain::{AdvanceOutcome, SeedOutcome};
use crate::error::BracketResult;

/// Primary Bracket API.
#[async_trait]
pub trait BracketApi: Send + Sync {
    /// React to the completion of `match_id`.
    ///
    /// Returns `LockBusy` without error when another worker holds the
    /// tournament. Safe to call repeatedly for the same match.
    async fn advance(&self, match_id: MatchId) -> BracketResult<AdvanceOutcome>;

    /// Create round 1 from the registration order and start the tournament.
    async fn seed_bracket(&self, tournament: TournamentId) -> BracketResult<SeedOutcome>;
}
