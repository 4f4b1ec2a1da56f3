//! Escrow Ledger service

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shared_store::{Collections, DocumentStore, StoreError};
use shared_types::{
    Clock, FaultInjector, SystemStateKind, SystemStateReader, TournamentId, TournamentStatus,
    Transaction, TransactionKind, TransactionReference, TransactionStatus, UserId,
};
use tracing::{debug, error, info, warn};

use crate::domain::{
    cap_payout, check_debit, daily_entry_spend, entry_fee_key, refund_key, CreditReceipt,
    DebitReceipt, PayoutReceipt,
};
use crate::error::{EscrowError, EscrowResult};
use crate::ports::inbound::EscrowApi;

/// Escrow guardrails
#[derive(Debug, Clone)]
pub struct EscrowConfig {
    pub max_entry_fee: i64,
    pub max_prize_payout: i64,
    /// Entry-fee spend allowed per user inside `daily_window`.
    pub max_daily_transfer: i64,
    pub daily_window: Duration,
    /// Absolute participant bound, applied on top of each tournament's own limit.
    pub max_tournament_participants: usize,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            max_entry_fee: 10_000,
            max_prize_payout: 500_000,
            max_daily_transfer: 20_000,
            daily_window: Duration::hours(24),
            max_tournament_participants: 1024,
        }
    }
}

/// Escrow Ledger over the shared store.
pub struct EscrowService {
    store: Arc<DocumentStore>,
    state: Arc<dyn SystemStateReader>,
    faults: Arc<FaultInjector>,
    clock: Arc<dyn Clock>,
    config: EscrowConfig,
}

impl EscrowService {
    pub fn new(
        store: Arc<DocumentStore>,
        state: Arc<dyn SystemStateReader>,
        faults: Arc<FaultInjector>,
        clock: Arc<dyn Clock>,
        config: EscrowConfig,
    ) -> Self {
        Self {
            store,
            state,
            faults,
            clock,
            config,
        }
    }

    /// Entry-fee debit against an open transaction.
    fn debit_in(
        &self,
        txn: &mut Collections,
        user: UserId,
        tournament: TournamentId,
        key: &str,
        now: DateTime<Utc>,
    ) -> EscrowResult<DebitReceipt> {
        let t = txn
            .tournament(&tournament)
            .map_err(|_| EscrowError::TournamentNotFound(tournament))?;
        let fee = t.entry_fee;
        let notes = format!("Entry fee for {}", t.name);

        let balance = txn
            .competitor(&user)
            .map_err(|_| EscrowError::UserNotFound(user))?
            .wallet_balance;

        if fee <= 0 {
            return Ok(DebitReceipt {
                user,
                tournament,
                fee: 0,
                new_balance: balance,
            });
        }

        let spent = daily_entry_spend(txn.transactions(), &user, now - self.config.daily_window);
        check_debit(
            fee,
            balance,
            spent,
            self.config.max_entry_fee,
            self.config.max_daily_transfer,
        )?;

        txn.competitor_mut(&user)?.wallet_balance = balance - fee;
        let record = Transaction::completed(
            user,
            TransactionKind::EntryFee,
            -fee,
            balance,
            Some(TransactionReference::Tournament(tournament)),
            now,
        )
        .with_key(key)
        .with_notes(notes);
        insert_keyed(txn, record, key)?;

        Ok(DebitReceipt {
            user,
            tournament,
            fee,
            new_balance: balance - fee,
        })
    }

    /// Persist a failed attempt outside the aborted transaction.
    fn record_failure(
        &self,
        user: UserId,
        kind: TransactionKind,
        amount: i64,
        reference: Option<TransactionReference>,
        notes: String,
    ) {
        let now = self.clock.now();
        let recorded = self.store.transaction(|c| -> Result<(), StoreError> {
            let balance = c.competitor(&user).map(|u| u.wallet_balance).unwrap_or(0);
            c.insert_transaction(Transaction::failed(
                user, kind, amount, balance, reference, notes, now,
            ))
        });
        if let Err(e) = recorded {
            error!(user = %user, kind = ?kind, error = %e, "[cx-04] Could not record failed attempt");
        }
    }

    /// Record a reused idempotency key as a ledger conflict.
    fn settle<T>(
        &self,
        result: EscrowResult<T>,
        user: UserId,
        kind: TransactionKind,
        amount: i64,
        reference: Option<TransactionReference>,
    ) -> EscrowResult<T> {
        if let Err(EscrowError::DuplicateRequest { key }) = &result {
            warn!(user = %user, key = %key, "[cx-04] Duplicate idempotency key rejected");
            self.record_failure(
                user,
                kind,
                amount,
                reference,
                format!("DUPLICATE_REQUEST: idempotency key {key} already used"),
            );
        }
        result
    }

    /// Whether a payout refused for this tournament is already on record for
    /// the current CRITICAL episode, which starts at the latest transition
    /// into CRITICAL.
    fn frozen_payout_recorded(&self, tournament: TournamentId) -> bool {
        self.store
            .read(|c| {
                let since = c
                    .state_transitions()
                    .iter()
                    .rev()
                    .find(|t| t.next == SystemStateKind::Critical)
                    .map(|t| t.at);
                c.transactions().iter().any(|t| {
                    t.kind == TransactionKind::PrizePayout
                        && t.status == TransactionStatus::Failed
                        && t.tournament() == Some(tournament)
                        && t.notes.starts_with("SYSTEM_CRITICAL")
                        && since.map_or(true, |at| t.created_at >= at)
                })
            })
            .unwrap_or(false)
    }

    fn existing_payout(c: &Collections, tournament: &TournamentId) -> Option<(UserId, i64)> {
        c.transactions()
            .iter()
            .find(|t| {
                t.kind == TransactionKind::PrizePayout
                    && t.is_completed()
                    && t.tournament() == Some(*tournament)
            })
            .map(|t| (t.user, t.amount))
    }

    fn already_paid(&self, tournament: TournamentId, winner: UserId) -> EscrowResult<PayoutReceipt> {
        let paid = self
            .store
            .read(|c| Self::existing_payout(c, &tournament))?;
        let (paid_to, payout) = paid.unwrap_or((winner, 0));
        Ok(PayoutReceipt {
            tournament,
            winner: paid_to,
            payout,
            capped: false,
            already_paid: true,
        })
    }

    async fn pay_out(&self, tournament: TournamentId, winner: UserId) -> EscrowResult<PayoutReceipt> {
        let state = self.state.current_state().await;
        if state.is_critical() {
            return Err(EscrowError::SystemCritical {
                reason: state.reason,
            });
        }

        self.faults
            .inject("Escrow: Prize Payout", &tournament.to_string())
            .await?;

        let now = self.clock.now();
        let max_payout = self.config.max_prize_payout;
        let result = self.store.transaction(|txn: &mut Collections| -> EscrowResult<PayoutReceipt> {
            if let Some((paid_to, payout)) = Self::existing_payout(txn, &tournament) {
                return Ok(PayoutReceipt {
                    tournament,
                    winner: paid_to,
                    payout,
                    capped: false,
                    already_paid: true,
                });
            }

            let t = txn
                .tournament(&tournament)
                .map_err(|_| EscrowError::TournamentNotFound(tournament))?;
            let pool = t.prize_pool();
            let notes = format!("Prize payout from {}", t.name);

            if pool <= 0 {
                return Ok(PayoutReceipt {
                    tournament,
                    winner,
                    payout: 0,
                    capped: false,
                    already_paid: false,
                });
            }

            let (payout, capped) = cap_payout(pool, max_payout);
            if capped {
                warn!(
                    tournament_id = %tournament,
                    pool,
                    cap = max_payout,
                    "[cx-04] Prize pool exceeds payout cap, clamping"
                );
            }

            let competitor = txn
                .competitor_mut(&winner)
                .map_err(|_| EscrowError::UserNotFound(winner))?;
            let previous = competitor.wallet_balance;
            competitor.wallet_balance = previous + payout;

            txn.insert_transaction(
                Transaction::completed(
                    winner,
                    TransactionKind::PrizePayout,
                    payout,
                    previous,
                    Some(TransactionReference::Tournament(tournament)),
                    now,
                )
                .with_notes(notes),
            )?;

            Ok(PayoutReceipt {
                tournament,
                winner,
                payout,
                capped,
                already_paid: false,
            })
        });

        match result {
            Err(EscrowError::Storage(e)) if e.is_unique_violation() => {
                debug!(tournament_id = %tournament, "[cx-04] Tournament paid concurrently");
                self.already_paid(tournament, winner)
            }
            other => other,
        }
    }
}

/// Insert a keyed record, turning a key collision into `DUPLICATE_REQUEST`.
fn insert_keyed(txn: &mut Collections, record: Transaction, key: &str) -> EscrowResult<()> {
    txn.insert_transaction(record).map_err(|e| {
        if e.is_unique_violation() {
            EscrowError::DuplicateRequest {
                key: key.to_string(),
            }
        } else {
            e.into()
        }
    })
}

#[async_trait]
impl EscrowApi for EscrowService {
    async fn debit_entry_fee(
        &self,
        user: UserId,
        tournament: TournamentId,
        key: Option<String>,
    ) -> EscrowResult<DebitReceipt> {
        let key = key.unwrap_or_else(|| entry_fee_key(&user, &tournament));
        self.faults.inject("Escrow: Entry Fee Deduction", &key).await?;

        let now = self.clock.now();
        let result = self
            .store
            .transaction(|txn| self.debit_in(txn, user, tournament, &key, now));
        let reference = Some(TransactionReference::Tournament(tournament));
        let receipt = self.settle(result, user, TransactionKind::EntryFee, 0, reference)?;

        info!(
            user = %user,
            tournament_id = %tournament,
            fee = receipt.fee,
            new_balance = receipt.new_balance,
            "[cx-04] Entry fee debited"
        );
        Ok(receipt)
    }

    async fn join_tournament(
        &self,
        user: UserId,
        tournament: TournamentId,
        key: Option<String>,
    ) -> EscrowResult<DebitReceipt> {
        let key = key.unwrap_or_else(|| entry_fee_key(&user, &tournament));
        self.faults.inject("Escrow: Entry Fee Deduction", &key).await?;

        let now = self.clock.now();
        let bound = self.config.max_tournament_participants;
        let result = self.store.transaction(|txn: &mut Collections| -> EscrowResult<DebitReceipt> {
            let t = txn
                .tournament(&tournament)
                .map_err(|_| EscrowError::TournamentNotFound(tournament))?;
            if t.status != TournamentStatus::Upcoming {
                return Err(EscrowError::TournamentClosed(tournament));
            }
            if t.has_participant(&user) {
                return Err(EscrowError::AlreadyRegistered { user, tournament });
            }
            let limit = (t.max_participants as usize).min(bound);
            if t.participants.len() >= limit {
                return Err(EscrowError::TournamentFull(tournament));
            }

            let receipt = self.debit_in(txn, user, tournament, &key, now)?;
            txn.tournament_mut(&tournament)?.participants.push(user);
            Ok(receipt)
        });
        let reference = Some(TransactionReference::Tournament(tournament));
        let receipt = self.settle(result, user, TransactionKind::EntryFee, 0, reference)?;

        info!(
            user = %user,
            tournament_id = %tournament,
            fee = receipt.fee,
            "[cx-04] Registered for tournament"
        );
        Ok(receipt)
    }

    async fn credit_prize_payout(
        &self,
        tournament: TournamentId,
        winner: UserId,
    ) -> EscrowResult<PayoutReceipt> {
        match self.pay_out(tournament, winner).await {
            Ok(receipt) => {
                if receipt.already_paid {
                    info!(tournament_id = %tournament, "[cx-04] Prize already paid, no-op");
                } else {
                    info!(
                        tournament_id = %tournament,
                        winner = %receipt.winner,
                        payout = receipt.payout,
                        capped = receipt.capped,
                        "[cx-04] Prize paid"
                    );
                }
                Ok(receipt)
            }
            Err(e @ EscrowError::SystemCritical { .. })
                if self.frozen_payout_recorded(tournament) =>
            {
                debug!(tournament_id = %tournament, "[cx-04] Prize payout still frozen");
                Err(e)
            }
            Err(e) => {
                error!(
                    tournament_id = %tournament,
                    winner = %winner,
                    code = e.code(),
                    error = %e,
                    "[cx-04] Prize payout failed"
                );
                self.record_failure(
                    winner,
                    TransactionKind::PrizePayout,
                    0,
                    Some(TransactionReference::Tournament(tournament)),
                    format!("{}: {e}", e.code()),
                );
                Err(e)
            }
        }
    }

    async fn deposit(&self, user: UserId, amount: i64, key: String) -> EscrowResult<CreditReceipt> {
        if amount <= 0 {
            return Err(EscrowError::InvalidAmount(amount));
        }

        let now = self.clock.now();
        let result = self.store.transaction(|txn: &mut Collections| -> EscrowResult<CreditReceipt> {
            let competitor = txn
                .competitor_mut(&user)
                .map_err(|_| EscrowError::UserNotFound(user))?;
            let previous = competitor.wallet_balance;
            competitor.wallet_balance = previous + amount;

            let record =
                Transaction::completed(user, TransactionKind::Deposit, amount, previous, None, now)
                    .with_key(key.as_str())
                    .with_notes("Deposit");
            insert_keyed(txn, record, &key)?;

            Ok(CreditReceipt {
                user,
                amount,
                new_balance: previous + amount,
            })
        });
        let receipt = self.settle(result, user, TransactionKind::Deposit, amount, None)?;

        debug!(user = %user, amount, new_balance = receipt.new_balance, "[cx-04] Deposit");
        Ok(receipt)
    }

    async fn refund_entry_fee(
        &self,
        user: UserId,
        tournament: TournamentId,
    ) -> EscrowResult<CreditReceipt> {
        let key = refund_key(&user, &tournament);
        let now = self.clock.now();

        let result = self.store.transaction(|txn: &mut Collections| -> EscrowResult<CreditReceipt> {
            let bound_to = |kind: TransactionKind| {
                move |t: &&Transaction| {
                    t.user == user
                        && t.kind == kind
                        && t.is_completed()
                        && t.tournament() == Some(tournament)
                }
            };
            let paid = txn
                .transactions()
                .iter()
                .find(bound_to(TransactionKind::EntryFee))
                .map(|t| t.amount.abs())
                .ok_or(EscrowError::NoEntryFee { user, tournament })?;
            if txn
                .transactions()
                .iter()
                .any(|t| bound_to(TransactionKind::Refund)(&t))
            {
                return Err(EscrowError::AlreadyRefunded { user, tournament });
            }

            let t = txn
                .tournament_mut(&tournament)
                .map_err(|_| EscrowError::TournamentNotFound(tournament))?;
            let notes = format!("Refund of entry fee for {}", t.name);
            if t.status == TournamentStatus::Upcoming {
                t.participants.retain(|p| *p != user);
            }

            let competitor = txn
                .competitor_mut(&user)
                .map_err(|_| EscrowError::UserNotFound(user))?;
            let previous = competitor.wallet_balance;
            competitor.wallet_balance = previous + paid;

            let record = Transaction::completed(
                user,
                TransactionKind::Refund,
                paid,
                previous,
                Some(TransactionReference::Tournament(tournament)),
                now,
            )
            .with_key(key.as_str())
            .with_notes(notes);
            insert_keyed(txn, record, &key)?;

            Ok(CreditReceipt {
                user,
                amount: paid,
                new_balance: previous + paid,
            })
        });
        let reference = Some(TransactionReference::Tournament(tournament));
        let receipt = self.settle(result, user, TransactionKind::Refund, 0, reference)?;

        info!(
            user = %user,
            tournament_id = %tournament,
            amount = receipt.amount,
            "[cx-04] Entry fee refunded"
        );
        Ok(receipt)
    }

    async fn balance(&self, user: UserId) -> EscrowResult<i64> {
        self.store
            .read(|c| c.competitor(&user).map(|u| u.wallet_balance))?
            .map_err(|_| EscrowError::UserNotFound(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        Competitor, GameId, ManualClock, StateSnapshot, StateTransition, StaticStateReader,
        Tournament,
    };

    struct Fixture {
        store: Arc<DocumentStore>,
        clock: Arc<ManualClock>,
        state: Arc<StaticStateReader>,
        svc: EscrowService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(DocumentStore::new());
        let clock = Arc::new(ManualClock::default());
        let state = Arc::new(StaticStateReader::default());
        let svc = EscrowService::new(
            Arc::clone(&store),
            state.clone(),
            Arc::new(FaultInjector::new()),
            clock.clone(),
            EscrowConfig::default(),
        );
        Fixture {
            store,
            clock,
            state,
            svc,
        }
    }

    impl Fixture {
        async fn player(&self, funds: i64) -> UserId {
            let c = Competitor::new("player");
            let id = c.id;
            self.store
                .transaction(|txn| {
                    txn.put_competitor(c);
                    Ok::<_, StoreError>(())
                })
                .unwrap();
            if funds > 0 {
                self.svc
                    .deposit(id, funds, format!("seed_{id}"))
                    .await
                    .unwrap();
            }
            id
        }

        fn tournament(&self, fee: i64, base_pool: i64) -> TournamentId {
            let mut t = Tournament::new("cup", GameId::new(), self.clock.now());
            t.entry_fee = fee;
            t.base_prize_pool = base_pool;
            let id = t.id;
            self.store
                .transaction(|txn| {
                    txn.put_tournament(t);
                    Ok::<_, StoreError>(())
                })
                .unwrap();
            id
        }

        fn failed(&self, kind: TransactionKind) -> usize {
            self.store
                .read(|c| {
                    c.transactions()
                        .iter()
                        .filter(|t| t.status == TransactionStatus::Failed && t.kind == kind)
                        .count()
                })
                .unwrap()
        }

        fn supply_balanced(&self) -> bool {
            self.store
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
    }

    #[tokio::test]
    async fn test_debit_records_transaction() {
        let f = fixture();
        let user = f.player(1_000).await;
        let t = f.tournament(250, 0);

        let receipt = f.svc.debit_entry_fee(user, t, None).await.unwrap();
        assert_eq!(receipt.new_balance, 750);
        assert_eq!(f.svc.balance(user).await.unwrap(), 750);

        let tx = f
            .store
            .read(|c| c.transactions().last().cloned())
            .unwrap()
            .unwrap();
        assert_eq!(tx.amount, -250);
        assert_eq!(tx.previous_balance, 1_000);
        assert_eq!(tx.idempotency_key, Some(entry_fee_key(&user, &t)));
        assert_eq!(tx.notes, "Entry fee for cup");
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balance() {
        let f = fixture();
        let user = f.player(100).await;
        let t = f.tournament(500, 0);

        let err = f.svc.debit_entry_fee(user, t, None).await.unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(f.svc.balance(user).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_fee_cap() {
        let f = fixture();
        let user = f.player(50_000).await;
        let t = f.tournament(10_001, 0);

        let err = f.svc.debit_entry_fee(user, t, None).await.unwrap_err();
        assert_eq!(err.code(), "FEE_CAP_EXCEEDED");
        assert_eq!(f.svc.balance(user).await.unwrap(), 50_000);
    }

    #[tokio::test]
    async fn test_daily_cap() {
        let f = fixture();
        let user = f.player(50_000).await;
        for fee in [10_000, 9_000] {
            let t = f.tournament(fee, 0);
            f.svc.debit_entry_fee(user, t, None).await.unwrap();
        }
        assert_eq!(f.svc.balance(user).await.unwrap(), 31_000);

        let too_much = f.tournament(1_500, 0);
        let err = f.svc.debit_entry_fee(user, too_much, None).await.unwrap_err();
        assert_eq!(err.code(), "DAILY_LIMIT_EXCEEDED");
        assert_eq!(f.svc.balance(user).await.unwrap(), 31_000);

        let fits = f.tournament(1_000, 0);
        let receipt = f.svc.debit_entry_fee(user, fits, None).await.unwrap();
        assert_eq!(receipt.new_balance, 30_000);

        // Window slides.
        f.clock.advance(Duration::hours(25));
        f.svc.debit_entry_fee(user, too_much, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_key_recorded_as_failed() {
        let f = fixture();
        let user = f.player(1_000).await;
        let t = f.tournament(100, 0);

        f.svc.debit_entry_fee(user, t, None).await.unwrap();
        let err = f.svc.debit_entry_fee(user, t, None).await.unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_REQUEST");
        assert_eq!(f.svc.balance(user).await.unwrap(), 900);
        assert_eq!(f.failed(TransactionKind::EntryFee), 1);
        assert!(f.supply_balanced());
    }

    #[tokio::test]
    async fn test_join_tournament() {
        let f = fixture();
        let a = f.player(1_000).await;
        let b = f.player(1_000).await;
        let c = f.player(1_000).await;
        let t = f.tournament(100, 0);
        f.store
            .transaction(|txn| {
                txn.tournament_mut(&t)?.max_participants = 2;
                Ok::<_, StoreError>(())
            })
            .unwrap();

        f.svc.join_tournament(a, t, None).await.unwrap();
        let err = f.svc.join_tournament(a, t, None).await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_REGISTERED");

        f.svc.join_tournament(b, t, None).await.unwrap();
        let err = f.svc.join_tournament(c, t, None).await.unwrap_err();
        assert_eq!(err.code(), "TOURNAMENT_FULL");
        assert_eq!(f.svc.balance(c).await.unwrap(), 1_000);

        let participants = f.store.tournament(&t).unwrap().participants;
        assert_eq!(participants, vec![a, b]);
    }

    #[tokio::test]
    async fn test_join_rejected_once_started() {
        let f = fixture();
        let user = f.player(1_000).await;
        let t = f.tournament(100, 0);
        f.store
            .transaction(|txn| {
                txn.tournament_mut(&t)?.status = TournamentStatus::Ongoing;
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let err = f.svc.join_tournament(user, t, None).await.unwrap_err();
        assert_eq!(err, EscrowError::TournamentClosed(t));
        assert_eq!(f.svc.balance(user).await.unwrap(), 1_000);
    }

    #[tokio::test]
    async fn test_payout_once() {
        let f = fixture();
        let a = f.player(1_000).await;
        let b = f.player(1_000).await;
        let t = f.tournament(100, 500);
        f.svc.join_tournament(a, t, None).await.unwrap();
        f.svc.join_tournament(b, t, None).await.unwrap();

        let first = f.svc.credit_prize_payout(t, a).await.unwrap();
        assert_eq!(first.payout, 700);
        assert!(!first.already_paid);
        assert_eq!(f.svc.balance(a).await.unwrap(), 1_600);

        let second = f.svc.credit_prize_payout(t, a).await.unwrap();
        assert!(second.already_paid);
        assert_eq!(second.payout, 700);
        assert_eq!(f.svc.balance(a).await.unwrap(), 1_600);
        assert!(f.supply_balanced());
    }

    #[tokio::test]
    async fn test_payout_refused_while_critical() {
        let f = fixture();
        let winner = f.player(0).await;
        let t = f.tournament(0, 1_000);
        f.state.set(SystemStateKind::Critical);

        let err = f.svc.credit_prize_payout(t, winner).await.unwrap_err();
        assert_eq!(err.code(), "SYSTEM_CRITICAL");
        assert_eq!(f.svc.balance(winner).await.unwrap(), 0);
        assert_eq!(f.failed(TransactionKind::PrizePayout), 1);

        f.state.set(SystemStateKind::Degraded);
        let receipt = f.svc.credit_prize_payout(t, winner).await.unwrap();
        assert_eq!(receipt.payout, 1_000);
    }

    #[tokio::test]
    async fn test_frozen_payout_recorded_once_per_episode() {
        let f = fixture();
        let winner = f.player(0).await;
        let t = f.tournament(0, 1_000);
        f.state.set(SystemStateKind::Critical);

        for _ in 0..5 {
            let err = f.svc.credit_prize_payout(t, winner).await.unwrap_err();
            assert_eq!(err.code(), "SYSTEM_CRITICAL");
        }
        assert_eq!(f.failed(TransactionKind::PrizePayout), 1);

        // A later escalation opens a new episode.
        f.clock.advance(Duration::hours(1));
        f.store
            .transaction(|c| {
                c.append_state_transition(StateTransition {
                    previous: SystemStateKind::Degraded,
                    next: SystemStateKind::Critical,
                    trigger: "supply mismatch".into(),
                    snapshot: StateSnapshot::Escalation {
                        source: "light".into(),
                        details: Vec::new(),
                    },
                    at: f.clock.now(),
                });
                Ok::<_, StoreError>(())
            })
            .unwrap();
        f.svc.credit_prize_payout(t, winner).await.unwrap_err();
        f.svc.credit_prize_payout(t, winner).await.unwrap_err();
        assert_eq!(f.failed(TransactionKind::PrizePayout), 2);

        f.state.set(SystemStateKind::Normal);
        assert_eq!(f.svc.credit_prize_payout(t, winner).await.unwrap().payout, 1_000);
    }

    #[tokio::test]
    async fn test_payout_clamped_to_cap() {
        let f = fixture();
        let winner = f.player(0).await;
        let t = f.tournament(0, 750_000);

        let receipt = f.svc.credit_prize_payout(t, winner).await.unwrap();
        assert!(receipt.capped);
        assert_eq!(receipt.payout, 500_000);
        assert_eq!(f.svc.balance(winner).await.unwrap(), 500_000);
    }

    #[tokio::test]
    async fn test_empty_pool_pays_nothing() {
        let f = fixture();
        let winner = f.player(0).await;
        let t = f.tournament(0, 0);

        let receipt = f.svc.credit_prize_payout(t, winner).await.unwrap();
        assert_eq!(receipt.payout, 0);
        assert_eq!(f.store.read(|c| c.transactions().len()).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_winner_records_failure() {
        let f = fixture();
        let t = f.tournament(0, 100);

        let err = f.svc.credit_prize_payout(t, UserId::new()).await.unwrap_err();
        assert_eq!(err.code(), "USER_NOT_FOUND");
        assert_eq!(f.failed(TransactionKind::PrizePayout), 1);
    }

    #[tokio::test]
    async fn test_refund_once() {
        let f = fixture();
        let user = f.player(1_000).await;
        let t = f.tournament(300, 0);
        f.svc.join_tournament(user, t, None).await.unwrap();

        let receipt = f.svc.refund_entry_fee(user, t).await.unwrap();
        assert_eq!(receipt.amount, 300);
        assert_eq!(receipt.new_balance, 1_000);
        assert!(f.store.tournament(&t).unwrap().participants.is_empty());

        let err = f.svc.refund_entry_fee(user, t).await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_REFUNDED");
        assert!(f.supply_balanced());
    }

    #[tokio::test]
    async fn test_refund_requires_entry_fee() {
        let f = fixture();
        let user = f.player(1_000).await;
        let t = f.tournament(300, 0);

        let err = f.svc.refund_entry_fee(user, t).await.unwrap_err();
        assert_eq!(err.code(), "NO_ENTRY_FEE");
    }

    #[tokio::test]
    async fn test_deposit_validation() {
        let f = fixture();
        let user = f.player(0).await;

        assert_eq!(
            f.svc.deposit(user, 0, "d1".into()).await.unwrap_err(),
            EscrowError::InvalidAmount(0)
        );
        f.svc.deposit(user, 40, "d1".into()).await.unwrap();
        let err = f.svc.deposit(user, 40, "d1".into()).await.unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_REQUEST");
        assert_eq!(f.svc.balance(user).await.unwrap(), 40);
    }

    #[tokio::test]
    async fn test_storage_outage_propagates() {
        let f = fixture();
        let user = f.player(1_000).await;
        let t = f.tournament(100, 0);
        f.store.set_available(false);

        let err = f.svc.debit_entry_fee(user, t, None).await.unwrap_err();
        assert!(matches!(err, EscrowError::Storage(_)));
        f.store.set_available(true);
        assert_eq!(f.svc.balance(user).await.unwrap(), 1_000);
    }
}
