//! # Match Result Intake
//!
//! Confirms a submitted result and fans it out to the three independent
//! consumers.
//!
//! ```text
//! confirm ──validate──→ store (completed, verified) ──→ rank-update
//!                                                   ├──→ integrity-analysis
//!                                                   └──→ tournament-advancement
//! ```
//!
//! Re-confirming a completed match dispatches the jobs again without
//! touching the stored result. Every consumer is idempotent, so this only
//! repairs a dispatch lost after the commit.

pub mod validation;

pub use validation::{validate_result, ResultSubmission, ResultValidationError, ValidatedResult};

use std::sync::Arc;

use shared_bus::{
    JobId, JobQueue, MatchJobPayload, QueueError, INTEGRITY_ANALYSIS_JOB, INTEGRITY_QUEUE,
    RANKING_QUEUE, RANK_UPDATE_JOB, TOURNAMENT_ADVANCEMENT_JOB, TOURNAMENT_QUEUE,
};
use shared_store::{Collections, DocumentStore, StoreError};
use shared_types::{
    Classify, Clock, ErrorClass, MatchId, MatchStatus, ScoringType, UserId, VerificationStatus,
};
use thiserror::Error;
use tracing::{info, warn};

/// Intake errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("Match {0} is disputed")]
    Disputed(MatchId),

    #[error("Match {match_id} has {count} participants, need at least 2")]
    TooFewParticipants { match_id: MatchId, count: usize },

    #[error("Invalid result for match {match_id}: {reason}")]
    InvalidResult {
        match_id: MatchId,
        #[source]
        reason: ResultValidationError,
    },

    #[error("Job payload encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl Classify for IntakeError {
    fn class(&self) -> ErrorClass {
        match self {
            IntakeError::MatchNotFound(_)
            | IntakeError::Disputed(_)
            | IntakeError::TooFewParticipants { .. }
            | IntakeError::Encoding(_) => ErrorClass::Validation,
            IntakeError::InvalidResult { reason, .. } => reason.class(),
            IntakeError::Storage(e) => e.class(),
            IntakeError::Queue(e) => e.class(),
        }
    }
}

/// Outcome of a confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedMatch {
    pub match_id: MatchId,
    pub winner: UserId,
    pub score: String,
    /// The match had already been confirmed; the stored result was kept.
    pub already_completed: bool,
    pub jobs: Vec<JobId>,
}

/// Confirms results and dispatches downstream processing.
pub struct MatchResultIntake {
    store: Arc<DocumentStore>,
    queue: Arc<dyn JobQueue>,
    clock: Arc<dyn Clock>,
}

impl MatchResultIntake {
    pub fn new(store: Arc<DocumentStore>, queue: Arc<dyn JobQueue>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            queue,
            clock,
        }
    }

    /// Validate and record the result of `match_id`, then enqueue the
    /// ranking, integrity and bracket jobs with payload `{matchId}`.
    pub async fn confirm_match_result(
        &self,
        match_id: MatchId,
        submission: &ResultSubmission,
    ) -> Result<ConfirmedMatch, IntakeError> {
        let now = self.clock.now();
        let (winner, score, already_completed) =
            self.store
                .transaction(|txn: &mut Collections| -> Result<_, IntakeError> {
                    let record = txn
                        .matches
                        .get(&match_id)
                        .ok_or(IntakeError::MatchNotFound(match_id))?;

                    if record.is_completed() {
                        if let Some(winner) = record.winner {
                            let score = record.score.clone().unwrap_or_default();
                            return Ok((winner, score, true));
                        }
                    }
                    if record.status == MatchStatus::Disputed {
                        return Err(IntakeError::Disputed(match_id));
                    }
                    if record.participants.len() < 2 {
                        return Err(IntakeError::TooFewParticipants {
                            match_id,
                            count: record.participants.len(),
                        });
                    }

                    let scoring = scoring_type(txn, record.tournament.as_ref());
                    let validated = validate_result(scoring, &record.participants, submission)
                        .map_err(|reason| IntakeError::InvalidResult { match_id, reason })?;

                    let record = txn.get_match_mut(&match_id)?;
                    record.winner = Some(validated.winner);
                    record.score = Some(validated.score.clone());
                    record.result = validated.result;
                    record.status = MatchStatus::Completed;
                    record.verification_status = VerificationStatus::Verified;
                    record.completed_at = Some(now);
                    Ok((validated.winner, validated.score, false))
                })?;

        if already_completed {
            warn!(match_id = %match_id, "[intake] Match already confirmed, re-dispatching jobs");
        } else {
            info!(match_id = %match_id, winner = %winner, score = %score, "[intake] Match result confirmed");
        }

        let jobs = self.dispatch(match_id).await?;
        Ok(ConfirmedMatch {
            match_id,
            winner,
            score,
            already_completed,
            jobs,
        })
    }

    async fn dispatch(&self, match_id: MatchId) -> Result<Vec<JobId>, IntakeError> {
        let payload = serde_json::to_value(MatchJobPayload { match_id })
            .map_err(|e| IntakeError::Encoding(e.to_string()))?;
        let mut jobs = Vec::with_capacity(3);
        for (queue, job) in [
            (RANKING_QUEUE, RANK_UPDATE_JOB),
            (INTEGRITY_QUEUE, INTEGRITY_ANALYSIS_JOB),
            (TOURNAMENT_QUEUE, TOURNAMENT_ADVANCEMENT_JOB),
        ] {
            jobs.push(self.queue.enqueue(queue, job, payload.clone()).await?);
        }
        Ok(jobs)
    }
}

/// Scoring type of the match's game. Casual matches are win-loss.
fn scoring_type(
    c: &Collections,
    tournament: Option<&shared_types::TournamentId>,
) -> ScoringType {
    tournament
        .and_then(|t| c.tournaments.get(t))
        .and_then(|t| c.games.get(&t.game))
        .map(|g| g.scoring_type)
        .unwrap_or_default()
}
