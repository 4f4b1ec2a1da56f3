//! Platform on a manual clock with seeding and draining helpers.

use std::sync::Arc;

use chrono::Utc;
use cx_04_escrow::EscrowApi;
use cx_05_bracket::BracketApi;
use prometheus::Registry;
use shared_bus::{JobQueue, MatchJobPayload};
use shared_store::StoreError;
use shared_types::{
    Competitor, Game, GameId, ManualClock, Match, MatchId, MatchStatus, ScoringType, Tournament,
    TournamentId, TransactionKind, UserId,
};
use worker_runtime::{Platform, PlatformConfig, ResultSubmission};

pub struct Harness {
    pub platform: Platform,
    pub clock: Arc<ManualClock>,
    pub game: GameId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PlatformConfig::default())
    }

    pub fn with_config(config: PlatformConfig) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let platform = Platform::build(config, clock.clone(), Registry::new()).unwrap();
        let game = Game::new("arena", ScoringType::WinLoss);
        let game_id = game.id;
        platform
            .store
            .transaction(|c| {
                c.put_game(game);
                Ok::<_, StoreError>(())
            })
            .unwrap();
        Self {
            platform,
            clock,
            game: game_id,
        }
    }

    /// A competitor funded through a deposit, so the ledger stays balanced.
    pub async fn player(&self, funds: i64) -> UserId {
        let competitor = Competitor::new("player");
        let id = competitor.id;
        self.platform
            .store
            .transaction(|c| {
                c.put_competitor(competitor);
                Ok::<_, StoreError>(())
            })
            .unwrap();
        if funds > 0 {
            self.platform
                .escrow
                .deposit(id, funds, format!("seed_{id}"))
                .await
                .unwrap();
        }
        id
    }

    pub fn tournament(&self, entry_fee: i64, base_prize_pool: i64) -> TournamentId {
        let mut t = Tournament::new("cup", self.game, Utc::now());
        t.entry_fee = entry_fee;
        t.base_prize_pool = base_prize_pool;
        t.max_participants = 1024;
        let id = t.id;
        self.platform
            .store
            .transaction(|c| {
                c.put_tournament(t);
                Ok::<_, StoreError>(())
            })
            .unwrap();
        id
    }

    /// `size` funded players joined through escrow, then the bracket seeded.
    pub async fn seeded_tournament(&self, size: usize, entry_fee: i64) -> (TournamentId, Vec<UserId>) {
        let t = self.tournament(entry_fee, 0);
        let mut players = Vec::with_capacity(size);
        for _ in 0..size {
            let p = self.player(entry_fee.max(1) * 10).await;
            self.platform.escrow.join_tournament(p, t, None).await.unwrap();
            players.push(p);
        }
        self.platform.bracket.seed_bracket(t).await.unwrap();
        (t, players)
    }

    /// A standalone completed duel inside a fresh tournament.
    pub fn completed_duel(&self, winner: UserId, loser: UserId) -> MatchId {
        let t = self.tournament(0, 0);
        let mut m = Match::scheduled(Some(t), 1, 0, vec![winner, loser], Utc::now());
        m.winner = Some(winner);
        m.status = MatchStatus::Completed;
        m.completed_at = Some(Utc::now());
        let id = m.id;
        self.platform
            .store
            .transaction(|c| {
                c.put_match(m);
                Ok::<_, StoreError>(())
            })
            .unwrap();
        id
    }

    pub fn round(&self, t: TournamentId, round: u32) -> Vec<Match> {
        self.platform
            .store
            .read(|c| c.matches_in_round(&t, round).into_iter().cloned().collect())
            .unwrap()
    }

    /// Confirm every open match of `round` with its first participant winning.
    pub async fn confirm_round(&self, t: TournamentId, round: u32) -> Vec<UserId> {
        let mut winners = Vec::new();
        for m in self.round(t, round) {
            if m.is_completed() {
                continue;
            }
            let winner = m.participants[0];
            self.platform
                .intake
                .confirm_match_result(m.id, &ResultSubmission::winner(winner))
                .await
                .unwrap();
            winners.push(winner);
        }
        winners
    }

    /// Re-dispatch a match job by hand, as a redelivering broker would.
    pub async fn redeliver(&self, queue: &str, job: &str, match_id: MatchId) {
        let payload = serde_json::to_value(MatchJobPayload { match_id }).unwrap();
        self.platform.broker.enqueue(queue, job, payload).await.unwrap();
    }

    /// Process every ready job of every queue inline until all are idle.
    pub async fn drain(&self) -> usize {
        let workers = self.platform.workers();
        let mut processed = 0;
        loop {
            let mut idle = true;
            for worker in &workers {
                while worker.process_next().await.is_some() {
                    processed += 1;
                    idle = false;
                }
            }
            if idle {
                return processed;
            }
        }
    }

    pub fn rating(&self, user: UserId) -> i64 {
        self.platform
            .store
            .competitor(&user)
            .unwrap()
            .game_record(&self.game)
            .rating_points
    }

    pub fn completed_count(&self, kind: TransactionKind) -> usize {
        self.platform
            .store
            .read(|c| {
                c.transactions()
                    .iter()
                    .filter(|t| t.kind == kind && t.is_completed())
                    .count()
            })
            .unwrap()
    }

    /// `sum(wallet) == sum(completed transaction amounts)`.
    pub fn supply_balanced(&self) -> bool {
        self.platform
            .store
            .read(|c| {
                let ledger: i64 = c
                    .transactions()
                    .iter()
                    .filter(|t| t.is_completed())
                    .map(|t| t.amount)
                    .sum();
                let wallets: i64 = c.competitors.values().map(|u| u.wallet_balance).sum();
                ledger == wallets
            })
            .unwrap()
    }

    pub fn no_negative_wallets(&self) -> bool {
        self.platform
            .store
            .read(|c| c.competitors.values().all(|u| u.wallet_balance >= 0))
            .unwrap()
    }
}
