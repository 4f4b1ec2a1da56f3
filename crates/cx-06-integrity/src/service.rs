//! Integrity Analyzer service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cx_01_idempotency_ledger::{IdempotencyLedger, IdempotencyLedgerApi, LedgerEntry};
use shared_store::{Collections, DocumentStore};
use shared_types::{
    Clock, GameId, IntegrityLog, IntegritySnapshot, Match, MatchId, MatchupFeatures,
    PredictionProvider, UserId,
};
use tracing::{debug, info, warn};

use crate::domain::{
    apply_decay, round2, AnomalyRules, IntegrityOutcome, ProbabilitySource, RolloverOutcome,
};
use crate::error::{IntegrityError, IntegrityResult};
use crate::ports::inbound::IntegrityApi;

/// Integrity configuration
#[derive(Debug, Clone)]
pub struct IntegrityConfig {
    /// Scores strictly above this flag the account.
    pub suspicion_threshold: f64,
    pub decay_period: chrono::Duration,
    pub decay_rate: f64,
    /// Clean wins above this probability earn `expected_win_relief`.
    pub expected_win_probability: f64,
    pub expected_win_relief: f64,
    pub rules: AnomalyRules,
    pub prediction_timeout: Duration,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            suspicion_threshold: 50.0,
            decay_period: chrono::Duration::days(7),
            decay_rate: 0.05,
            expected_win_probability: 0.7,
            expected_win_relief: 2.0,
            rules: AnomalyRules::default(),
            prediction_timeout: Duration::from_secs(2),
        }
    }
}

/// Integrity Analyzer over the shared store.
pub struct IntegrityService<P: PredictionProvider> {
    store: Arc<DocumentStore>,
    ledger: Arc<IdempotencyLedger>,
    predictor: Arc<P>,
    clock: Arc<dyn Clock>,
    config: IntegrityConfig,
}

impl<P: PredictionProvider> IntegrityService<P> {
    pub fn new(
        store: Arc<DocumentStore>,
        ledger: Arc<IdempotencyLedger>,
        predictor: Arc<P>,
        clock: Arc<dyn Clock>,
        config: IntegrityConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            predictor,
            clock,
            config,
        }
    }

    fn load(&self, match_id: MatchId) -> IntegrityResult<(Match, Option<GameId>)> {
        self.store.read(|c| -> IntegrityResult<(Match, Option<GameId>)> {
            let m = c
                .matches
                .get(&match_id)
                .cloned()
                .ok_or(IntegrityError::MatchNotFound(match_id))?;
            let game = m
                .tournament
                .and_then(|t| c.tournaments.get(&t))
                .map(|t| t.game);
            Ok((m, game))
        })?
    }

    async fn winner_probability(&self, features: &MatchupFeatures) -> (f64, ProbabilitySource) {
        let prediction =
            tokio::time::timeout(self.config.prediction_timeout, self.predictor.predict(features))
                .await
                .ok()
                .flatten()
                .filter(|p| p.is_valid());

        match prediction {
            Some(p) => (p.win_probability, ProbabilitySource::Prediction),
            None => {
                warn!("[cx-06] Prediction service unavailable, using Elo expectation");
                (features.elo_expectation(), ProbabilitySource::EloFallback)
            }
        }
    }

    /// Apply one analysis inside an open transaction. `None` if already applied.
    fn apply(
        &self,
        txn: &mut Collections,
        m: &Match,
        winner: UserId,
        probability: f64,
        source: ProbabilitySource,
        now: chrono::DateTime<chrono::Utc>,
    ) -> IntegrityResult<Option<IntegrityOutcome>> {
        if !self
            .ledger
            .record_once_in(txn, &LedgerEntry::integrity(winner, m.id))?
            .created
        {
            return Ok(None);
        }
        let others: Vec<UserId> = m
            .participants
            .iter()
            .copied()
            .filter(|p| *p != winner)
            .collect();
        for other in &others {
            self.ledger
                .record_once_in(txn, &LedgerEntry::integrity(*other, m.id))?;
        }

        for user in &m.participants {
            let competitor = txn.competitor_mut(user)?;
            if let Some(removed) = apply_decay(
                &mut competitor.integrity,
                now,
                self.config.decay_period,
                self.config.decay_rate,
            ) {
                debug!(user = %user, removed, "[cx-06] Suspicion decayed");
            }
            if *user != winner {
                competitor.integrity.win_streak = 0;
            }
        }

        let threshold = self.config.suspicion_threshold;
        let record = &mut txn.competitor_mut(&winner)?.integrity;
        record.win_streak += 1;
        let assessment = self.config.rules.assess(probability, record.win_streak);

        let mut outcome = IntegrityOutcome {
            match_id: m.id,
            winner: Some(winner),
            win_probability: Some(probability),
            source: Some(source),
            delta: 0.0,
            reasons: assessment.reasons.clone(),
            flagged: false,
            unflagged: false,
            skipped: false,
        };

        if assessment.is_anomalous() {
            record.suspicion_score = round2(record.suspicion_score + assessment.delta);
            record.last_suspicion_increase_at = Some(now);
            if record.suspicion_score > threshold && !record.is_flagged {
                record.is_flagged = true;
                record.last_flagged_at = Some(now);
                outcome.flagged = true;
                outcome.reasons.push("SUSPICION THRESHOLD EXCEEDED".to_string());
            }
            outcome.delta = assessment.delta;

            let snapshot = IntegritySnapshot {
                winner_probability: probability,
                prediction_available: source == ProbabilitySource::Prediction,
                win_streak: record.win_streak,
                suspicion_score: record.suspicion_score,
            };
            txn.append_integrity_log(IntegrityLog {
                user: winner,
                match_id: m.id,
                reasons: outcome.reasons.clone(),
                score_delta: assessment.delta,
                snapshot,
                created_at: now,
            });
        } else if probability > self.config.expected_win_probability {
            let before = record.suspicion_score;
            record.suspicion_score = (before - self.config.expected_win_relief).max(0.0);
            outcome.delta = record.suspicion_score - before;
            if record.is_flagged && record.suspicion_score < threshold {
                record.is_flagged = false;
                outcome.unflagged = true;
            }
        }

        Ok(Some(outcome))
    }
}

/// Halve every positive score; unflag accounts that fall under `threshold`.
fn halve_scores(txn: &mut Collections, threshold: f64, outcome: &mut RolloverOutcome) {
    for competitor in txn.competitors.values_mut() {
        let record = &mut competitor.integrity;
        if record.suspicion_score > 0.0 {
            record.suspicion_score = round2(record.suspicion_score * 0.5);
            outcome.halved += 1;
        }
        if record.is_flagged && record.suspicion_score < threshold {
            record.is_flagged = false;
            outcome.unflagged += 1;
        }
    }
}

#[async_trait]
impl<P: PredictionProvider + 'static> IntegrityApi for IntegrityService<P> {
    async fn analyze_match(&self, match_id: MatchId) -> IntegrityResult<IntegrityOutcome> {
        let (m, game) = self.load(match_id)?;
        if !m.is_completed() {
            return Err(IntegrityError::MatchNotCompleted(match_id));
        }
        let winner = m.winner.filter(|w| m.participants.contains(w));
        let (Some(winner), Some(loser)) = (winner, m.loser()) else {
            debug!(match_id = %match_id, "[cx-06] Nothing to analyze (bye or no winner)");
            return Ok(IntegrityOutcome::skipped(match_id));
        };

        let stats = |c: &Collections, user: &UserId| -> IntegrityResult<_> {
            let competitor = c.competitor(user)?;
            Ok(game.map(|g| competitor.game_record(&g)).unwrap_or_default())
        };
        let (w_stats, l_stats, fenced) = self.store.read(|c| -> IntegrityResult<_> {
            let fenced = c.has_fence(&LedgerEntry::integrity(winner, match_id).fence());
            Ok((stats(c, &winner)?, stats(c, &loser)?, fenced))
        })??;
        if fenced {
            debug!(match_id = %match_id, "[cx-06] Match already analyzed, skipping");
            return Ok(IntegrityOutcome {
                winner: Some(winner),
                ..IntegrityOutcome::skipped(match_id)
            });
        }

        let features = MatchupFeatures::from_stats(&w_stats, &l_stats);
        let (probability, source) = self.winner_probability(&features).await;

        let now = self.clock.now();
        let applied = self.store.transaction(|txn: &mut Collections| {
            self.apply(txn, &m, winner, probability, source, now)
        })?;

        let Some(outcome) = applied else {
            debug!(match_id = %match_id, "[cx-06] Match analyzed concurrently, skipping");
            return Ok(IntegrityOutcome {
                winner: Some(winner),
                ..IntegrityOutcome::skipped(match_id)
            });
        };

        if outcome.delta > 0.0 {
            warn!(
                match_id = %match_id,
                winner = %winner,
                delta = outcome.delta,
                probability,
                reasons = %outcome.reasons.join(", "),
                flagged = outcome.flagged,
                "[cx-06] Suspicious win"
            );
        } else {
            debug!(match_id = %match_id, winner = %winner, probability, "[cx-06] Match analyzed");
        }
        Ok(outcome)
    }

    async fn check_seasons(&self) -> IntegrityResult<RolloverOutcome> {
        let now = self.clock.now();
        let threshold = self.config.suspicion_threshold;

        let outcome = self
            .store
            .transaction(|txn: &mut Collections| -> IntegrityResult<RolloverOutcome> {
                let mut outcome = RolloverOutcome::default();
                let Some(ended) = txn
                    .active_season()
                    .filter(|s| s.end_date <= now)
                    .map(|s| s.id)
                else {
                    return Ok(outcome);
                };
                if let Some(season) = txn.seasons.get_mut(&ended) {
                    season.is_active = false;
                }
                outcome.deactivated = Some(ended);

                let next = txn
                    .seasons
                    .values()
                    .filter(|s| !s.is_active && s.start_date <= now && s.end_date > now)
                    .min_by_key(|s| s.start_date)
                    .map(|s| s.id);
                if let Some(next) = next {
                    if let Some(season) = txn.seasons.get_mut(&next) {
                        season.is_active = true;
                    }
                    outcome.activated = Some(next);
                    halve_scores(txn, threshold, &mut outcome);
                }
                Ok(outcome)
            })?;

        match (outcome.deactivated, outcome.activated) {
            (Some(ended), Some(next)) => info!(
                ended = %ended,
                activated = %next,
                halved = outcome.halved,
                unflagged = outcome.unflagged,
                "[cx-06] Season rolled over, suspicion scores halved"
            ),
            (Some(ended), None) => {
                info!(ended = %ended, "[cx-06] Season expired, no successor scheduled")
            }
            _ => debug!("[cx-06] Active season still running"),
        }
        Ok(outcome)
    }

    async fn apply_season_rollover(&self) -> IntegrityResult<RolloverOutcome> {
        let threshold = self.config.suspicion_threshold;
        let outcome = self
            .store
            .transaction(|txn: &mut Collections| -> IntegrityResult<RolloverOutcome> {
                let mut outcome = RolloverOutcome::default();
                halve_scores(txn, threshold, &mut outcome);
                Ok(outcome)
            })?;
        info!(halved = outcome.halved, unflagged = outcome.unflagged, "[cx-06] Suspicion scores halved");
        Ok(outcome)
    }
}
