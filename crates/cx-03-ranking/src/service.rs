//! Ranking Processor service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cx_01_idempotency_ledger::{IdempotencyLedger, IdempotencyLedgerApi, LedgerEntry};
use shared_store::{Collections, DocumentStore};
use shared_types::{
    Clock, FaultInjector, GameId, Match, MatchId, MatchupFeatures, PredictionProvider,
    ScoringType, SeasonId,
};
use tracing::{debug, info, warn};

use crate::domain::{
    duel_deltas, margin_multiplier, placement_delta, placement_score, ExpectationSource,
    ParticipantDelta, RankingOutcome,
};
use crate::error::{RankingError, RankingResult};
use crate::ports::inbound::RankingApi;

/// Ranking configuration
#[derive(Debug, Clone)]
pub struct RankingConfig {
    /// K for duels before the margin multiplier.
    pub base_k: f64,
    /// K for placement lobbies.
    pub placement_k: f64,
    pub margin_divisor: f64,
    pub max_margin_multiplier: f64,
    pub prediction_timeout: Duration,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            base_k: 32.0,
            placement_k: 40.0,
            margin_divisor: 26.0,
            max_margin_multiplier: 2.0,
            prediction_timeout: Duration::from_secs(1),
        }
    }
}

/// Everything needed to rate one match, read before any write.
struct MatchContext {
    game: GameId,
    scoring: ScoringType,
    season: Option<SeasonId>,
    record: Match,
}

/// Ranking Processor over the shared store.
pub struct RankingService<P: PredictionProvider> {
    store: Arc<DocumentStore>,
    ledger: Arc<IdempotencyLedger>,
    predictor: Arc<P>,
    faults: Arc<FaultInjector>,
    clock: Arc<dyn Clock>,
    config: RankingConfig,
}

impl<P: PredictionProvider> RankingService<P> {
    pub fn new(
        store: Arc<DocumentStore>,
        ledger: Arc<IdempotencyLedger>,
        predictor: Arc<P>,
        faults: Arc<FaultInjector>,
        clock: Arc<dyn Clock>,
        config: RankingConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            predictor,
            faults,
            clock,
            config,
        }
    }

    fn load_context(&self, match_id: MatchId) -> RankingResult<Option<MatchContext>> {
        self.store.read(|c| -> RankingResult<Option<MatchContext>> {
            let record = c
                .matches
                .get(&match_id)
                .cloned()
                .ok_or(RankingError::MatchNotFound(match_id))?;
            if !record.is_completed() {
                return Err(RankingError::MatchNotCompleted(match_id));
            }

            let Some(tournament) = record.tournament.and_then(|t| c.tournaments.get(&t)) else {
                return Ok(None);
            };
            let Some(game) = c.games.get(&tournament.game) else {
                return Ok(None);
            };
            let season = tournament
                .season
                .or_else(|| c.active_season().map(|s| s.id));

            Ok(Some(MatchContext {
                game: game.id,
                scoring: game.scoring_type,
                season,
                record,
            }))
        })?
    }

    async fn expected_for_winner(
        &self,
        features: &MatchupFeatures,
    ) -> (f64, ExpectationSource) {
        let prediction =
            tokio::time::timeout(self.config.prediction_timeout, self.predictor.predict(features))
                .await
                .ok()
                .flatten()
                .filter(|p| p.is_valid());

        match prediction {
            Some(p) => (p.win_probability, ExpectationSource::Prediction),
            None => {
                warn!("[cx-03] Prediction service unavailable, using standard Elo");
                (features.elo_expectation(), ExpectationSource::EloFallback)
            }
        }
    }

    async fn process_duel(&self, ctx: MatchContext) -> RankingResult<RankingOutcome> {
        let m = &ctx.record;
        let mut outcome = RankingOutcome::new(m.id);

        let winner = m
            .winner
            .filter(|w| m.participants.contains(w))
            .ok_or(RankingError::NoWinner(m.id))?;
        let loser = m.loser().ok_or(RankingError::NoWinner(m.id))?;

        let winner_entry = LedgerEntry::ranking(winner, m.id);
        let loser_entry = LedgerEntry::ranking(loser, m.id);

        // Cheap pre-check so redelivered jobs skip the prediction call.
        let (w_stats, l_stats, fenced) = self.store.read(|c| -> RankingResult<_> {
            let fenced = c.has_fence(&winner_entry.fence());
            Ok((
                c.competitor(&winner)?.game_record(&ctx.game),
                c.competitor(&loser)?.game_record(&ctx.game),
                fenced,
            ))
        })??;
        if fenced {
            debug!(match_id = %m.id, "[cx-03] Duel already ranked, skipping");
            outcome.skipped = vec![winner, loser];
            return Ok(outcome);
        }

        let multiplier = if ctx.scoring == ScoringType::RoundBased {
            let w = m.result.scores.get(&winner).copied().unwrap_or(0);
            let l = m.result.scores.get(&loser).copied().unwrap_or(0);
            margin_multiplier(
                w,
                l,
                self.config.margin_divisor,
                self.config.max_margin_multiplier,
            )
        } else {
            1.0
        };
        let k = self.config.base_k * multiplier;

        self.faults
            .inject("Ranking: Elo Duel", &m.id.to_string())
            .await?;

        let features = MatchupFeatures::from_stats(&w_stats, &l_stats);
        let (expected, source) = self.expected_for_winner(&features).await;
        let (w_delta, l_delta) = duel_deltas(k, expected);
        outcome.source = Some(source);

        let now = self.clock.now();
        let applied = self.store.transaction(
            |txn: &mut Collections| -> RankingResult<Option<Vec<ParticipantDelta>>> {
                if !self.ledger.record_once_in(txn, &winner_entry)?.created {
                    return Ok(None);
                }
                if !self.ledger.record_once_in(txn, &loser_entry)?.created {
                    return Err(RankingError::LedgerInconsistent {
                        match_id: m.id,
                        user: loser,
                    });
                }

                let mut applied = Vec::with_capacity(2);
                for (user, delta, is_win) in [(winner, w_delta, true), (loser, l_delta, false)] {
                    let competitor = txn.competitor_mut(&user)?;
                    competitor.apply_rating(ctx.game, ctx.season, delta, is_win, now);
                    applied.push(ParticipantDelta {
                        user,
                        delta,
                        new_rating: competitor.game_record(&ctx.game).rating_points,
                        is_win,
                    });
                }
                Ok(Some(applied))
            },
        )?;

        match applied {
            Some(applied) => {
                info!(
                    match_id = %m.id,
                    winner = %winner,
                    winner_delta = w_delta,
                    loser = %loser,
                    loser_delta = l_delta,
                    k,
                    expected,
                    source = ?source,
                    "[cx-03] Duel ranked"
                );
                outcome.applied = applied;
            }
            None => {
                debug!(match_id = %m.id, "[cx-03] Duel ranked concurrently, skipping");
                outcome.skipped = vec![winner, loser];
            }
        }
        Ok(outcome)
    }

    async fn process_placement(&self, ctx: MatchContext) -> RankingResult<RankingOutcome> {
        let m = &ctx.record;
        let mut outcome = RankingOutcome::new(m.id);
        outcome.source = Some(ExpectationSource::LobbyAverage);
        let players = m.participants.len();

        for &user in &m.participants {
            let entry = LedgerEntry::ranking(user, m.id);

            self.faults
                .inject("Ranking: BR Placement", &m.id.to_string())
                .await?;

            let now = self.clock.now();
            let placement = m.result.placements.get(&user).copied();
            let applied = self.store.transaction(
                |txn: &mut Collections| -> RankingResult<Option<ParticipantDelta>> {
                    if !self.ledger.record_once_in(txn, &entry)?.created {
                        return Ok(None);
                    }

                    let mut total = 0i64;
                    for p in &m.participants {
                        total += txn.competitor(p)?.game_record(&ctx.game).rating_points;
                    }
                    let lobby_average = total as f64 / players as f64;

                    let competitor = txn.competitor_mut(&user)?;
                    let rating = competitor.game_record(&ctx.game).rating_points;
                    let actual = placement_score(players, placement);
                    let delta =
                        placement_delta(self.config.placement_k, actual, rating, lobby_average);
                    let is_win = placement == Some(1);
                    competitor.apply_rating(ctx.game, ctx.season, delta, is_win, now);

                    Ok(Some(ParticipantDelta {
                        user,
                        delta,
                        new_rating: rating + delta,
                        is_win,
                    }))
                },
            )?;

            match applied {
                Some(delta) => {
                    debug!(
                        match_id = %m.id,
                        user = %user,
                        delta = delta.delta,
                        placement = ?placement,
                        "[cx-03] Placement ranked"
                    );
                    outcome.applied.push(delta);
                }
                None => outcome.skipped.push(user),
            }
        }

        info!(
            match_id = %m.id,
            applied = outcome.applied.len(),
            skipped = outcome.skipped.len(),
            "[cx-03] Placement lobby ranked"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl<P: PredictionProvider + 'static> RankingApi for RankingService<P> {
    async fn process_match(&self, match_id: MatchId) -> RankingResult<RankingOutcome> {
        let Some(ctx) = self.load_context(match_id)? else {
            debug!(match_id = %match_id, "[cx-03] Match has no game context, nothing to rank");
            return Ok(RankingOutcome::new(match_id));
        };

        let count = ctx.record.participants.len();
        if count < 2 {
            return Err(RankingError::TooFewParticipants { match_id, count });
        }

        if ctx.scoring == ScoringType::PointsBased && count > 2 {
            self.process_placement(ctx).await
        } else {
            self.process_duel(ctx).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{
        Competitor, FixedPredictor, Game, ManualClock, MatchResult, Season, Tournament,
        UnavailablePredictor, UserId,
    };

    struct Fixture {
        store: Arc<DocumentStore>,
        game: GameId,
        tournament: shared_types::TournamentId,
        players: Vec<UserId>,
    }

    fn fixture(scoring: ScoringType, players: usize) -> Fixture {
        let store = Arc::new(DocumentStore::new());
        let game = Game::new("arena", scoring);
        let tournament = Tournament::new("cup", game.id, Utc::now());
        let competitors: Vec<Competitor> = (0..players)
            .map(|i| Competitor::new(format!("p{i}")))
            .collect();
        let ids = competitors.iter().map(|c| c.id).collect();
        let (game_id, tournament_id) = (game.id, tournament.id);

        store
            .transaction(|c| {
                c.put_game(game);
                c.put_tournament(tournament);
                for competitor in competitors {
                    c.put_competitor(competitor);
                }
                Ok::<_, shared_store::StoreError>(())
            })
            .unwrap();

        Fixture {
            store,
            game: game_id,
            tournament: tournament_id,
            players: ids,
        }
    }

    fn completed_match(f: &Fixture, winner: UserId, result: MatchResult) -> MatchId {
        let mut m = Match::scheduled(Some(f.tournament), 1, 0, f.players.clone(), Utc::now());
        m.status = shared_types::MatchStatus::Completed;
        m.winner = Some(winner);
        m.result = result;
        let id = m.id;
        f.store
            .transaction(|c| {
                c.put_match(m);
                Ok::<_, shared_store::StoreError>(())
            })
            .unwrap();
        id
    }

    fn service<P: PredictionProvider>(f: &Fixture, predictor: P) -> RankingService<P> {
        RankingService::new(
            Arc::clone(&f.store),
            Arc::new(IdempotencyLedger::new(Arc::clone(&f.store))),
            Arc::new(predictor),
            Arc::new(FaultInjector::new()),
            Arc::new(ManualClock::default()),
            RankingConfig::default(),
        )
    }

    fn rating(f: &Fixture, user: UserId) -> i64 {
        f.store.competitor(&user).unwrap().game_record(&f.game).rating_points
    }

    #[tokio::test]
    async fn test_duel_fallback_and_redelivery() {
        let f = fixture(ScoringType::WinLoss, 2);
        let (a, b) = (f.players[0], f.players[1]);
        let m = completed_match(&f, a, MatchResult::default());
        let svc = service(&f, UnavailablePredictor);

        let first = svc.process_match(m).await.unwrap();
        assert_eq!(first.applied.len(), 2);
        assert_eq!(first.source, Some(ExpectationSource::EloFallback));
        assert_eq!(rating(&f, a), 1016);
        assert_eq!(rating(&f, b), 984);

        let second = svc.process_match(m).await.unwrap();
        assert!(second.is_noop());
        assert_eq!(second.skipped.len(), 2);
        assert_eq!(rating(&f, a), 1016);
        assert_eq!(f.store.competitor(&a).unwrap().stats.matches_played, 1);
    }

    #[tokio::test]
    async fn test_duel_uses_prediction() {
        let f = fixture(ScoringType::WinLoss, 2);
        let m = completed_match(&f, f.players[0], MatchResult::default());
        let svc = service(&f, FixedPredictor::new(0.25));

        let outcome = svc.process_match(m).await.unwrap();
        assert_eq!(outcome.source, Some(ExpectationSource::Prediction));
        assert_eq!(rating(&f, f.players[0]), 1024);
        assert_eq!(rating(&f, f.players[1]), 976);
    }

    #[tokio::test]
    async fn test_round_based_margin_scales_k() {
        let f = fixture(ScoringType::RoundBased, 2);
        let (a, b) = (f.players[0], f.players[1]);
        let mut result = MatchResult::default();
        result.scores.insert(a, 13);
        result.scores.insert(b, 0);
        let m = completed_match(&f, a, result);

        service(&f, UnavailablePredictor)
            .process_match(m)
            .await
            .unwrap();
        // K = 32 * 1.5 = 48, E = 0.5
        assert_eq!(rating(&f, a), 1024);
        assert_eq!(rating(&f, b), 976);
    }

    #[tokio::test]
    async fn test_season_record_updated() {
        let f = fixture(ScoringType::WinLoss, 2);
        let season = Season {
            id: SeasonId::new(),
            name: "S1".into(),
            start_date: Utc::now(),
            end_date: Utc::now() + chrono::Duration::days(30),
            is_active: true,
        };
        let season_id = season.id;
        f.store
            .transaction(|c| {
                c.put_season(season);
                Ok::<_, shared_store::StoreError>(())
            })
            .unwrap();
        let m = completed_match(&f, f.players[0], MatchResult::default());

        service(&f, UnavailablePredictor)
            .process_match(m)
            .await
            .unwrap();
        let winner = f.store.competitor(&f.players[0]).unwrap();
        assert_eq!(winner.season_stats[&season_id][&f.game].rating_points, 1016);
        assert_eq!(winner.stats.rating_points, 1016);
    }

    #[tokio::test]
    async fn test_placement_lobby() {
        let f = fixture(ScoringType::PointsBased, 4);
        let mut result = MatchResult::default();
        for (i, p) in f.players.iter().enumerate() {
            result.placements.insert(*p, i as u32 + 1);
        }
        let m = completed_match(&f, f.players[0], result);

        let outcome = service(&f, UnavailablePredictor)
            .process_match(m)
            .await
            .unwrap();
        assert_eq!(outcome.applied.len(), 4);
        // First player moves the lobby average before the others are rated.
        assert_eq!(rating(&f, f.players[0]), 1020);
        assert!(rating(&f, f.players[3]) < 1000);
        assert!(f.store.competitor(&f.players[0]).unwrap().stats.wins == 1);
        assert!(f.store.competitor(&f.players[1]).unwrap().stats.losses == 1);
    }

    #[tokio::test]
    async fn test_placement_resumes_after_partial_run() {
        let f = fixture(ScoringType::PointsBased, 3);
        let m = completed_match(&f, f.players[0], MatchResult::default());
        let ledger = IdempotencyLedger::new(Arc::clone(&f.store));
        ledger
            .record_once(&LedgerEntry::ranking(f.players[0], m))
            .await
            .unwrap();

        let outcome = service(&f, UnavailablePredictor)
            .process_match(m)
            .await
            .unwrap();
        assert_eq!(outcome.skipped, vec![f.players[0]]);
        assert_eq!(outcome.applied.len(), 2);
        assert_eq!(rating(&f, f.players[0]), 1000);
    }

    #[tokio::test]
    async fn test_incomplete_match_rejected() {
        let f = fixture(ScoringType::WinLoss, 2);
        let m = Match::scheduled(Some(f.tournament), 1, 0, f.players.clone(), Utc::now());
        let id = m.id;
        f.store
            .transaction(|c| {
                c.put_match(m);
                Ok::<_, shared_store::StoreError>(())
            })
            .unwrap();

        let err = service(&f, UnavailablePredictor)
            .process_match(id)
            .await
            .unwrap_err();
        assert_eq!(err, RankingError::MatchNotCompleted(id));
    }

    #[tokio::test]
    async fn test_unknown_match_rejected() {
        let f = fixture(ScoringType::WinLoss, 2);
        let id = MatchId::new();
        assert_eq!(
            service(&f, UnavailablePredictor)
                .process_match(id)
                .await
                .unwrap_err(),
            RankingError::MatchNotFound(id)
        );
    }
}
