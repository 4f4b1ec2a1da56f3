//! Bracket Automator service

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cx_02_lock_manager::{DistributedLockApi, LockError, LockGuard};
use cx_04_escrow::{EscrowError, PayoutReceipt};
use shared_bus::{EventPublisher, PlatformEvent};
use shared_store::{Collections, DocumentStore};
use shared_types::{
    Badge, Clock, FaultInjector, Match, MatchId, TournamentId, TournamentStatus, UserId,
};
use tracing::{debug, info, warn};

use crate::domain::{pair_in_order, AdvanceOutcome, AdvanceStep, SeedOutcome, Slot};
use crate::error::{BracketError, BracketResult};
use crate::ports::inbound::BracketApi;
use crate::ports::outbound::PrizeDisbursement;

/// Lock resource guarding a tournament's match list.
pub fn tournament_lock_key(tournament: &TournamentId) -> String {
    format!("lock:tournament:{tournament}")
}

/// Bracket configuration
#[derive(Debug, Clone)]
pub struct BracketConfig {
    pub lock_ttl: Duration,
    /// Lifetime rating granted to the champion.
    pub champion_bonus: i64,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(5),
            champion_bonus: 100,
        }
    }
}

/// Result of checking one round under the lock.
enum RoundCheck {
    Pending,
    AlreadyAdvanced,
    Final(UserId),
    Advanced {
        created: Vec<MatchId>,
        byes: usize,
        /// Every new match is a bye, so the new round is already complete.
        complete: bool,
    },
}

/// Bracket Automator over the shared store.
pub struct BracketService {
    store: Arc<DocumentStore>,
    locks: Arc<dyn DistributedLockApi>,
    payouts: Arc<dyn PrizeDisbursement>,
    notifier: Arc<dyn EventPublisher>,
    faults: Arc<FaultInjector>,
    clock: Arc<dyn Clock>,
    config: BracketConfig,
}

impl BracketService {
    pub fn new(
        store: Arc<DocumentStore>,
        locks: Arc<dyn DistributedLockApi>,
        payouts: Arc<dyn PrizeDisbursement>,
        notifier: Arc<dyn EventPublisher>,
        faults: Arc<FaultInjector>,
        clock: Arc<dyn Clock>,
        config: BracketConfig,
    ) -> Self {
        Self {
            store,
            locks,
            payouts,
            notifier,
            faults,
            clock,
            config,
        }
    }

    async fn lock(&self, tournament: &TournamentId) -> Result<LockGuard, LockError> {
        self.locks
            .acquire(&[tournament_lock_key(tournament)], self.config.lock_ttl)
            .await
    }

    /// Work-list of rounds to check, all under one lease.
    async fn advance_locked(
        &self,
        guard: &LockGuard,
        tournament: TournamentId,
        round: u32,
    ) -> BracketResult<Vec<AdvanceStep>> {
        self.faults
            .inject("Tournament: Bracket Advance", &tournament.to_string())
            .await?;

        let mut steps = Vec::new();
        let mut rounds = VecDeque::from([round]);

        while let Some(round) = rounds.pop_front() {
            if guard.is_lost() {
                return Err(BracketError::LockLost(tournament));
            }

            match self.check_round(tournament, round, self.clock.now())? {
                RoundCheck::Pending => {
                    debug!(tournament_id = %tournament, round, "[cx-05] Round still has pending matches");
                    steps.push(AdvanceStep::RoundPending { round });
                }
                RoundCheck::AlreadyAdvanced => {
                    debug!(tournament_id = %tournament, round, "[cx-05] Round already advanced");
                    steps.push(AdvanceStep::AlreadyAdvanced { round });
                }
                RoundCheck::Final(winner) => match self.finalize(tournament, winner).await {
                    Ok(payout) => steps.push(AdvanceStep::Finalized { winner, payout }),
                    Err(BracketError::Payout(EscrowError::SystemCritical { reason })) => {
                        warn!(
                            tournament_id = %tournament,
                            winner = %winner,
                            reason = %reason,
                            "[cx-05] Prize payout frozen, still owed"
                        );
                        steps.push(AdvanceStep::PayoutFrozen { winner, reason });
                    }
                    Err(e) => return Err(e),
                },
                RoundCheck::Advanced {
                    created,
                    byes,
                    complete,
                } => {
                    let next = round + 1;
                    info!(
                        tournament_id = %tournament,
                        round = next,
                        matches = created.len(),
                        byes,
                        "[cx-05] Bracket advanced"
                    );
                    self.notifier
                        .publish(PlatformEvent::BracketAdvanced {
                            tournament,
                            round: next,
                        })
                        .await;
                    if complete {
                        rounds.push_back(next);
                    }
                    steps.push(AdvanceStep::Advanced {
                        round: next,
                        created,
                        byes,
                    });
                }
            }
        }

        Ok(steps)
    }

    fn check_round(
        &self,
        tournament: TournamentId,
        round: u32,
        now: DateTime<Utc>,
    ) -> BracketResult<RoundCheck> {
        self.store
            .transaction(|txn: &mut Collections| -> BracketResult<RoundCheck> {
                if txn.tournaments.get(&tournament).is_none() {
                    return Err(BracketError::TournamentNotFound(tournament));
                }

                let winners = {
                    let matches = txn.matches_in_round(&tournament, round);
                    if matches.is_empty() || !matches.iter().all(|m| m.is_completed()) {
                        return Ok(RoundCheck::Pending);
                    }
                    matches
                        .iter()
                        .map(|m| m.winner)
                        .collect::<Option<Vec<UserId>>>()
                        .ok_or(BracketError::MissingWinner { tournament, round })?
                };

                if let [champion] = winners.as_slice() {
                    return Ok(RoundCheck::Final(*champion));
                }

                let next = round + 1;
                if !txn.matches_in_round(&tournament, next).is_empty() {
                    return Ok(RoundCheck::AlreadyAdvanced);
                }

                let (created, byes) = create_round(txn, tournament, next, &winners, now)?;
                Ok(RoundCheck::Advanced {
                    complete: byes == created.len(),
                    created,
                    byes,
                })
            })
    }

    /// Close the tournament once, then pay out (idempotent in escrow).
    async fn finalize(&self, tournament: TournamentId, winner: UserId) -> BracketResult<PayoutReceipt> {
        let now = self.clock.now();
        let bonus = self.config.champion_bonus;

        let newly_completed = self
            .store
            .transaction(|txn: &mut Collections| -> BracketResult<bool> {
                let t = txn
                    .tournament_mut(&tournament)
                    .map_err(|_| BracketError::TournamentNotFound(tournament))?;
                if t.status == TournamentStatus::Completed {
                    return Ok(false);
                }
                t.status = TournamentStatus::Completed;
                t.end_date = Some(now);
                let name = t.name.clone();
                let game = t.game;

                let title = txn
                    .games
                    .get(&game)
                    .map(|g| g.name.clone())
                    .unwrap_or_else(|| "an esports title".to_string());
                match txn.competitor_mut(&winner) {
                    Ok(champion) => {
                        champion.badges.push(Badge {
                            name: format!("{name} Champion"),
                            description: format!("Won the {name} tournament playing {title}."),
                            awarded_at: now,
                        });
                        champion.stats.rating_points += bonus;
                    }
                    Err(_) => {
                        warn!(tournament_id = %tournament, winner = %winner, "[cx-05] Champion account missing, no badge");
                    }
                }
                Ok(true)
            })?;

        if newly_completed {
            info!(tournament_id = %tournament, winner = %winner, "[cx-05] Tournament completed");
        }

        let receipt = self.payouts.disburse(tournament, winner).await?;

        self.faults
            .inject("Tournament: Reward Finalization Payload", &tournament.to_string())
            .await?;

        if newly_completed || !receipt.already_paid {
            self.notifier
                .publish(PlatformEvent::TournamentCompleted { tournament, winner })
                .await;
        }
        Ok(receipt)
    }

    fn seed_locked(&self, tournament: TournamentId) -> BracketResult<SeedOutcome> {
        let now = self.clock.now();
        self.store
            .transaction(|txn: &mut Collections| -> BracketResult<SeedOutcome> {
                let participants = txn
                    .tournament(&tournament)
                    .map_err(|_| BracketError::TournamentNotFound(tournament))?
                    .participants
                    .clone();

                let existing: Vec<MatchId> = txn
                    .matches_in_round(&tournament, 1)
                    .iter()
                    .map(|m| m.id)
                    .collect();
                if !existing.is_empty() {
                    return Ok(SeedOutcome {
                        tournament,
                        matches: existing,
                        created: false,
                    });
                }

                if participants.len() < 2 {
                    return Err(BracketError::TooFewParticipants {
                        tournament,
                        count: participants.len(),
                    });
                }

                let (matches, _) = create_round(txn, tournament, 1, &participants, now)?;
                txn.tournament_mut(&tournament)?.status = TournamentStatus::Ongoing;
                Ok(SeedOutcome {
                    tournament,
                    matches,
                    created: true,
                })
            })
    }
}

/// Insert the matches of `round` pairing `players` in order.
/// Returns the new match ids (slot order) and the number of byes.
fn create_round(
    txn: &mut Collections,
    tournament: TournamentId,
    round: u32,
    players: &[UserId],
    now: DateTime<Utc>,
) -> BracketResult<(Vec<MatchId>, usize)> {
    let mut created = Vec::new();
    let mut byes = 0;

    for (position, slot) in (0u32..).zip(pair_in_order(players)) {
        let m = match slot {
            Slot::Duel(a, b) => {
                Match::scheduled(Some(tournament), round, position, vec![a, b], now)
            }
            Slot::Bye(player) => {
                byes += 1;
                Match::bye(tournament, round, position, player, now)
            }
        };
        created.push(m.id);
        txn.put_match(m);
    }

    txn.tournament_mut(&tournament)?
        .matches
        .extend(created.iter().copied());
    Ok((created, byes))
}

#[async_trait]
impl BracketApi for BracketService {
    async fn advance(&self, match_id: MatchId) -> BracketResult<AdvanceOutcome> {
        let (tournament, round) = self
            .store
            .read(|c| c.get_match(&match_id).map(|m| (m.tournament, m.round)))?
            .map_err(|_| BracketError::MatchNotFound(match_id))?;
        let Some(tournament) = tournament else {
            return Ok(AdvanceOutcome::NotInTournament);
        };

        let guard = match self.lock(&tournament).await {
            Ok(guard) => guard,
            Err(LockError::Contention { .. }) => {
                info!(
                    tournament_id = %tournament,
                    match_id = %match_id,
                    "[cx-05] Tournament locked by another worker, skipping"
                );
                return Ok(AdvanceOutcome::LockBusy { tournament });
            }
            Err(e) => return Err(e.into()),
        };

        let result = self.advance_locked(&guard, tournament, round).await;
        guard.release().await;

        Ok(AdvanceOutcome::Processed {
            tournament,
            steps: result?,
        })
    }

    async fn seed_bracket(&self, tournament: TournamentId) -> BracketResult<SeedOutcome> {
        let guard = self.lock(&tournament).await?;
        let result = self.seed_locked(tournament);
        guard.release().await;
        let outcome = result?;

        if outcome.created {
            info!(
                tournament_id = %tournament,
                matches = outcome.matches.len(),
                "[cx-05] Bracket seeded"
            );
            self.notifier
                .publish(PlatformEvent::BracketAdvanced {
                    tournament,
                    round: 1,
                })
                .await;
        }
        Ok(outcome)
    }
}
