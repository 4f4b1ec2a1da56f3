//! Consumers of the per-match jobs dispatched by intake.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cortex_telemetry::CortexMetrics;
use cx_03_ranking::RankingApi;
use cx_05_bracket::{AdvanceOutcome, BracketApi};
use cx_06_integrity::IntegrityApi;
use shared_bus::{Job, JobFailure, JobHandler, MatchJobPayload, TOURNAMENT_ADVANCEMENT_JOB};
use tracing::{debug, info, warn};

/// Delay before a job blocked by a busy tournament lock runs again.
pub const LOCK_BUSY_DELAY: Duration = Duration::from_secs(1);
/// Delay between payout attempts while payouts are frozen.
pub const PAYOUT_FROZEN_DELAY: Duration = Duration::from_secs(30);

/// `rank-update`: apply rating deltas for every participant.
pub struct RankingJobHandler {
    ranking: Arc<dyn RankingApi>,
    metrics: Arc<CortexMetrics>,
}

impl RankingJobHandler {
    pub fn new(ranking: Arc<dyn RankingApi>, metrics: Arc<CortexMetrics>) -> Self {
        Self { ranking, metrics }
    }
}

#[async_trait]
impl JobHandler for RankingJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobFailure> {
        let MatchJobPayload { match_id } = job.decode()?;
        let outcome = self
            .ranking
            .process_match(match_id)
            .await
            .map_err(|e| JobFailure::from_error(&e))?;

        self.metrics
            .rating_updates
            .with_label_values(&["applied"])
            .inc_by(outcome.applied.len() as u64);
        if !outcome.skipped.is_empty() {
            self.metrics
                .rating_updates
                .with_label_values(&["skipped"])
                .inc_by(outcome.skipped.len() as u64);
            self.metrics
                .ledger_skips
                .with_label_values(&[job.name.as_str()])
                .inc();
        }
        debug!(
            match_id = %match_id,
            applied = outcome.applied.len(),
            skipped = outcome.skipped.len(),
            "[worker] Ranking job done"
        );
        Ok(())
    }
}

/// `integrity-analysis`: score the winner's suspicion.
pub struct IntegrityJobHandler {
    integrity: Arc<dyn IntegrityApi>,
    metrics: Arc<CortexMetrics>,
}

impl IntegrityJobHandler {
    pub fn new(integrity: Arc<dyn IntegrityApi>, metrics: Arc<CortexMetrics>) -> Self {
        Self { integrity, metrics }
    }
}

#[async_trait]
impl JobHandler for IntegrityJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobFailure> {
        let MatchJobPayload { match_id } = job.decode()?;
        let outcome = self
            .integrity
            .analyze_match(match_id)
            .await
            .map_err(|e| JobFailure::from_error(&e))?;

        if outcome.skipped {
            self.metrics
                .ledger_skips
                .with_label_values(&[job.name.as_str()])
                .inc();
        } else if outcome.flagged {
            info!(match_id = %match_id, reasons = ?outcome.reasons, "[worker] Winner flagged for review");
        }
        Ok(())
    }
}

/// `tournament-advancement`: move the winner up the bracket.
///
/// A busy tournament lock or a frozen prize payout postpones the job without
/// spending its attempts. The lock holder may have read the round before this
/// match completed, and a frozen prize stays owed until the freeze lifts.
pub struct TournamentJobHandler {
    bracket: Arc<dyn BracketApi>,
    metrics: Arc<CortexMetrics>,
}

impl TournamentJobHandler {
    pub fn new(bracket: Arc<dyn BracketApi>, metrics: Arc<CortexMetrics>) -> Self {
        Self { bracket, metrics }
    }
}

#[async_trait]
impl JobHandler for TournamentJobHandler {
    async fn handle(&self, job: &Job) -> Result<(), JobFailure> {
        let MatchJobPayload { match_id } = job.decode()?;
        let outcome = self
            .bracket
            .advance(match_id)
            .await
            .map_err(|e| JobFailure::from_error(&e))?;

        match &outcome {
            AdvanceOutcome::LockBusy { tournament } => {
                self.metrics
                    .lock_contention_skips
                    .with_label_values(&[TOURNAMENT_ADVANCEMENT_JOB])
                    .inc();
                debug!(match_id = %match_id, tournament = %tournament, "[worker] Tournament locked elsewhere");
                return Err(JobFailure::postponed(
                    LOCK_BUSY_DELAY,
                    format!("Tournament {tournament} locked elsewhere"),
                ));
            }
            AdvanceOutcome::Processed { tournament, .. } => {
                if let Some(reason) = outcome.payout_frozen() {
                    warn!(tournament = %tournament, reason, "[worker] Prize payout frozen, postponing");
                    return Err(JobFailure::postponed(
                        PAYOUT_FROZEN_DELAY,
                        format!("Prize payout for tournament {tournament} frozen: {reason}"),
                    ));
                }
                if let Some(champion) = outcome.champion() {
                    info!(tournament = %tournament, champion = %champion, "[worker] Tournament finished");
                }
            }
            AdvanceOutcome::NotInTournament => {}
        }
        Ok(())
    }
}
