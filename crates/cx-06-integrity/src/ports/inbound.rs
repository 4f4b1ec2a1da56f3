//! Driving Ports (API - Inbound)

use async_trait::async_trait;
use shared_types::MatchId;

use crate::domain::{IntegrityOutcome, RolloverOutcome};
use crate::error::IntegrityResult;

/// Primary Integrity API.
#[async_trait]
pub trait IntegrityApi: Send + Sync {
    /// Analyze a completed match. Repeated calls for the same match are no-ops.
    async fn analyze_match(&self, match_id: MatchId) -> IntegrityResult<IntegrityOutcome>;

    /// Roll the active season over if it has ended.
    async fn check_seasons(&self) -> IntegrityResult<RolloverOutcome>;

    /// Halve every positive suspicion score and unflag those under threshold.
    async fn apply_season_rollover(&self) -> IntegrityResult<RolloverOutcome>;
}
