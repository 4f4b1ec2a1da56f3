//! Transactional document store.
//!
//! All collections live behind a single mutex. A transaction works on a
//! staged copy of the collections and swaps it in only when the closure
//! returns `Ok`, so a multi-document mutation is either fully visible or not
//! at all. The append-only logs and the unique indexes sit behind `Arc`s and
//! are copied only by a transaction that writes to them.
//!
//! Unique indexes are enforced at insert time with set lookups:
//!
//! | index | key |
//! |---|---|
//! | `ledger_fence` | `(scope, subject, event)` |
//! | `transaction_idempotency_key` | `idempotency_key` when present |
//! | `tournament_prize_payout` | `(reference, prize_payout)` over completed records |

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::{
    Competitor, Game, GameId, IntegrityLog, Match, MatchId, Season, SeasonId, StateTransition,
    Tournament, TournamentId, Transaction, TransactionKind, UserId,
};
use tracing::trace;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Compound-unique marker proving an effect was applied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fence {
    pub scope: &'static str,
    pub subject: Uuid,
    pub event: Uuid,
}

/// Every collection of the store. Handed to transaction closures.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    pub competitors: BTreeMap<UserId, Competitor>,
    pub games: BTreeMap<GameId, Game>,
    pub seasons: BTreeMap<SeasonId, Season>,
    pub tournaments: BTreeMap<TournamentId, Tournament>,
    pub matches: BTreeMap<MatchId, Match>,
    transactions: Arc<Vec<Transaction>>,
    idempotency_keys: Arc<HashSet<String>>,
    paid_tournaments: Arc<HashSet<TournamentId>>,
    fences: Arc<BTreeSet<Fence>>,
    integrity_logs: Arc<Vec<IntegrityLog>>,
    state_transitions: Arc<Vec<StateTransition>>,
}

impl Collections {
    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    pub fn competitor(&self, id: &UserId) -> StoreResult<&Competitor> {
        self.competitors
            .get(id)
            .ok_or_else(|| StoreError::not_found("competitor", id))
    }

    pub fn competitor_mut(&mut self, id: &UserId) -> StoreResult<&mut Competitor> {
        self.competitors
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("competitor", id))
    }

    pub fn game(&self, id: &GameId) -> StoreResult<&Game> {
        self.games
            .get(id)
            .ok_or_else(|| StoreError::not_found("game", id))
    }

    pub fn tournament(&self, id: &TournamentId) -> StoreResult<&Tournament> {
        self.tournaments
            .get(id)
            .ok_or_else(|| StoreError::not_found("tournament", id))
    }

    pub fn tournament_mut(&mut self, id: &TournamentId) -> StoreResult<&mut Tournament> {
        self.tournaments
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("tournament", id))
    }

    pub fn get_match(&self, id: &MatchId) -> StoreResult<&Match> {
        self.matches
            .get(id)
            .ok_or_else(|| StoreError::not_found("match", id))
    }

    pub fn get_match_mut(&mut self, id: &MatchId) -> StoreResult<&mut Match> {
        self.matches
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("match", id))
    }

    /// Matches of one tournament round, ordered by bracket position.
    pub fn matches_in_round(&self, tournament: &TournamentId, round: u32) -> Vec<&Match> {
        let mut matches: Vec<&Match> = self
            .matches
            .values()
            .filter(|m| m.tournament.as_ref() == Some(tournament) && m.round == round)
            .collect();
        matches.sort_by_key(|m| (m.bracket_position, m.created_at));
        matches
    }

    /// The currently active season, if any.
    pub fn active_season(&self) -> Option<&Season> {
        self.seasons.values().find(|s| s.is_active)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn fences(&self) -> impl Iterator<Item = &Fence> {
        self.fences.iter()
    }

    pub fn has_fence(&self, fence: &Fence) -> bool {
        self.fences.contains(fence)
    }

    pub fn integrity_logs(&self) -> &[IntegrityLog] {
        &self.integrity_logs
    }

    pub fn state_transitions(&self) -> &[StateTransition] {
        &self.state_transitions
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    pub fn put_competitor(&mut self, competitor: Competitor) {
        self.competitors.insert(competitor.id, competitor);
    }

    pub fn put_game(&mut self, game: Game) {
        self.games.insert(game.id, game);
    }

    pub fn put_season(&mut self, season: Season) {
        self.seasons.insert(season.id, season);
    }

    pub fn put_tournament(&mut self, tournament: Tournament) {
        self.tournaments.insert(tournament.id, tournament);
    }

    pub fn put_match(&mut self, m: Match) {
        self.matches.insert(m.id, m);
    }

    /// Insert a fence. Fails with `UniqueViolation` if it already exists.
    pub fn insert_fence(&mut self, fence: Fence) -> StoreResult<()> {
        if self.fences.contains(&fence) {
            return Err(StoreError::UniqueViolation {
                index: "ledger_fence",
            });
        }
        Arc::make_mut(&mut self.fences).insert(fence);
        Ok(())
    }

    /// Append a transaction record, enforcing the transaction indexes.
    pub fn insert_transaction(&mut self, tx: Transaction) -> StoreResult<()> {
        if let Some(key) = tx.idempotency_key.as_deref() {
            if self.idempotency_keys.contains(key) {
                return Err(StoreError::UniqueViolation {
                    index: "transaction_idempotency_key",
                });
            }
        }

        let paid_tournament = if tx.kind == TransactionKind::PrizePayout && tx.is_completed() {
            tx.tournament()
        } else {
            None
        };
        if let Some(tournament) = paid_tournament {
            if self.paid_tournaments.contains(&tournament) {
                return Err(StoreError::UniqueViolation {
                    index: "tournament_prize_payout",
                });
            }
        }

        if let Some(key) = &tx.idempotency_key {
            Arc::make_mut(&mut self.idempotency_keys).insert(key.clone());
        }
        if let Some(tournament) = paid_tournament {
            Arc::make_mut(&mut self.paid_tournaments).insert(tournament);
        }
        Arc::make_mut(&mut self.transactions).push(tx);
        Ok(())
    }

    pub fn append_integrity_log(&mut self, log: IntegrityLog) {
        Arc::make_mut(&mut self.integrity_logs).push(log);
    }

    pub fn append_state_transition(&mut self, transition: StateTransition) {
        Arc::make_mut(&mut self.state_transitions).push(transition);
    }
}

/// In-memory transactional document store.
#[derive(Debug)]
pub struct DocumentStore {
    inner: Mutex<Collections>,
    available: AtomicBool,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Collections::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: transactions and reads fail with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "document store offline".to_string(),
            });
        }
        Ok(())
    }

    /// Run `f` as one atomic multi-document transaction.
    ///
    /// Writes made by `f` become visible only if it returns `Ok`.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Collections) -> Result<T, E>,
    {
        self.check_available()?;
        let mut guard = self.inner.lock();
        let mut staged = guard.clone();
        match f(&mut staged) {
            Ok(value) => {
                *guard = staged;
                Ok(value)
            }
            Err(e) => {
                trace!("[store] Transaction aborted, staged writes discarded");
                Err(e)
            }
        }
    }

    /// Consistent read over all collections.
    pub fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Collections) -> T,
    {
        self.check_available()?;
        let guard = self.inner.lock();
        Ok(f(&guard))
    }

    pub fn competitor(&self, id: &UserId) -> StoreResult<Competitor> {
        self.read(|c| c.competitor(id).cloned())?
    }

    pub fn tournament(&self, id: &TournamentId) -> StoreResult<Tournament> {
        self.read(|c| c.tournament(id).cloned())?
    }

    pub fn get_match(&self, id: &MatchId) -> StoreResult<Match> {
        self.read(|c| c.get_match(id).cloned())?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{TransactionReference, TransactionStatus};

    fn fence(subject: Uuid, event: Uuid) -> Fence {
        Fence {
            scope: "ranking",
            subject,
            event,
        }
    }

    #[test]
    fn test_commit_on_ok() {
        let store = DocumentStore::new();
        let alice = Competitor::new("alice");
        let id = alice.id;

        store
            .transaction(|c| {
                c.put_competitor(alice);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        assert_eq!(store.competitor(&id).unwrap().username, "alice");
    }

    #[test]
    fn test_rollback_on_err() {
        let store = DocumentStore::new();
        let alice = Competitor::new("alice");
        let id = alice.id;
        store
            .transaction(|c| {
                c.put_competitor(alice);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let result: StoreResult<()> = store.transaction(|c| {
            c.competitor_mut(&id)?.wallet_balance = 500;
            c.insert_fence(fence(id.0, Uuid::new_v4()))?;
            Err(StoreError::Unavailable {
                reason: "boom".into(),
            })
        });

        assert!(result.is_err());
        assert_eq!(store.competitor(&id).unwrap().wallet_balance, 0);
        assert_eq!(store.read(|c| c.fences().count()).unwrap(), 0);
    }

    #[test]
    fn test_fence_is_unique() {
        let mut c = Collections::default();
        let (s, e) = (Uuid::new_v4(), Uuid::new_v4());
        c.insert_fence(fence(s, e)).unwrap();
        let err = c.insert_fence(fence(s, e)).unwrap_err();
        assert!(err.is_unique_violation());

        // Different scope is a different fence.
        c.insert_fence(Fence {
            scope: "integrity",
            subject: s,
            event: e,
        })
        .unwrap();
    }

    #[test]
    fn test_idempotency_key_is_unique() {
        let mut c = Collections::default();
        let user = UserId::new();
        let now = Utc::now();
        let tx = Transaction::completed(user, TransactionKind::Deposit, 100, 0, None, now)
            .with_key("dep-1");
        c.insert_transaction(tx.clone()).unwrap();

        let dup = Transaction::completed(user, TransactionKind::Deposit, 100, 100, None, now)
            .with_key("dep-1");
        assert!(c.insert_transaction(dup).unwrap_err().is_unique_violation());
    }

    #[test]
    fn test_prize_payout_unique_only_for_completed() {
        let mut c = Collections::default();
        let user = UserId::new();
        let tournament = TournamentId::new();
        let reference = Some(TransactionReference::Tournament(tournament));
        let now = Utc::now();

        let failed = Transaction::failed(
            user,
            TransactionKind::PrizePayout,
            500,
            0,
            reference.clone(),
            "system critical",
            now,
        );
        c.insert_transaction(failed.clone()).unwrap();
        c.insert_transaction(failed).unwrap();

        let paid = Transaction::completed(
            user,
            TransactionKind::PrizePayout,
            500,
            0,
            reference.clone(),
            now,
        );
        c.insert_transaction(paid.clone()).unwrap();
        let err = c.insert_transaction(paid).unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                index: "tournament_prize_payout"
            }
        );
        assert_eq!(
            c.transactions()
                .iter()
                .filter(|t| t.status == TransactionStatus::Failed)
                .count(),
            2
        );
    }

    #[test]
    fn test_matches_in_round_sorted_by_position() {
        let mut c = Collections::default();
        let t = TournamentId::new();
        let now = Utc::now();
        for pos in [2, 0, 1] {
            c.put_match(Match::scheduled(
                Some(t),
                1,
                pos,
                vec![UserId::new(), UserId::new()],
                now,
            ));
        }
        c.put_match(Match::scheduled(Some(t), 2, 0, vec![UserId::new()], now));

        let positions: Vec<u32> = c
            .matches_in_round(&t, 1)
            .iter()
            .map(|m| m.bracket_position)
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_aborted_insert_releases_unique_keys() {
        let store = DocumentStore::new();
        let user = UserId::new();
        let tournament = TournamentId::new();
        let now = Utc::now();
        let payout = || {
            Transaction::completed(
                user,
                TransactionKind::PrizePayout,
                500,
                0,
                Some(TransactionReference::Tournament(tournament)),
                now,
            )
            .with_key("payout-1")
        };

        let aborted: StoreResult<()> = store.transaction(|c| {
            c.insert_transaction(payout())?;
            Err(StoreError::Unavailable {
                reason: "boom".into(),
            })
        });
        assert!(aborted.is_err());

        store.transaction(|c| c.insert_transaction(payout())).unwrap();
        let dup: StoreResult<()> = store.transaction(|c| c.insert_transaction(payout()));
        assert_eq!(
            dup,
            Err(StoreError::UniqueViolation {
                index: "transaction_idempotency_key"
            })
        );
    }

    #[test]
    fn test_ledger_shared_by_transactions_that_skip_it() {
        let store = DocumentStore::new();
        let user = UserId::new();
        store
            .transaction(|c| {
                c.insert_transaction(Transaction::completed(
                    user,
                    TransactionKind::Deposit,
                    100,
                    0,
                    None,
                    Utc::now(),
                ))
            })
            .unwrap();
        let before = Arc::clone(&store.inner.lock().transactions);

        store
            .transaction(|c| {
                c.put_competitor(Competitor::new("bob"));
                Ok::<_, StoreError>(())
            })
            .unwrap();
        assert!(Arc::ptr_eq(&before, &store.inner.lock().transactions));
    }

    #[test]
    fn test_unavailable_store() {
        let store = DocumentStore::new();
        store.set_available(false);
        let result: StoreResult<()> = store.transaction(|_| Ok(()));
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }
}
