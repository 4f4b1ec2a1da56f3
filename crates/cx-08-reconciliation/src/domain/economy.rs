//! Economic reconciliation checks.
//!
//! Only completed transactions move money, so only they are reconciled.
//! Failed attempts are audit records and may legitimately point at a
//! missing winner or repeat a binding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_store::Collections;
use shared_types::{TournamentId, TransactionKind, UserId};

/// Total wallets against total completed transaction amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SupplySnapshot {
    pub wallets: i64,
    pub transactions: i64,
}

impl SupplySnapshot {
    pub fn is_conserved(&self) -> bool {
        self.wallets == self.transactions
    }
}

/// A (user, tournament, kind) binding recorded more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateBinding {
    pub user: UserId,
    pub tournament: TournamentId,
    pub kind: TransactionKind,
    pub count: usize,
}

/// A wallet that does not match its own transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMismatch {
    pub user: UserId,
    pub expected: i64,
    pub actual: i64,
}

/// Everything one economic scan found.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EconomyFindings {
    pub supply: SupplySnapshot,
    pub orphaned_users: usize,
    pub orphaned_tournaments: usize,
    pub duplicate_bindings: Vec<DuplicateBinding>,
    /// Only populated by deep scans.
    pub wallet_mismatches: Vec<WalletMismatch>,
}

impl EconomyFindings {
    /// Human-readable failure lines; empty when the economy reconciles.
    pub fn failures(&self, sample: usize) -> Vec<String> {
        let mut failures = Vec::new();
        if !self.supply.is_conserved() {
            failures.push(format!(
                "Total CRX supply mismatch: wallets={}, transactions={}",
                self.supply.wallets, self.supply.transactions
            ));
        }
        if self.orphaned_users > 0 {
            failures.push(format!(
                "Orphaned transactions: {} transactions belong to missing users",
                self.orphaned_users
            ));
        }
        if self.orphaned_tournaments > 0 {
            failures.push(format!(
                "Orphaned reference: {} transactions reference missing tournaments",
                self.orphaned_tournaments
            ));
        }
        if !self.duplicate_bindings.is_empty() {
            failures.push(format!(
                "Duplicate reference: {} duplicated user-tournament transaction bindings detected",
                self.duplicate_bindings.len()
            ));
        }
        if !self.wallet_mismatches.is_empty() {
            let examples: Vec<String> = self
                .wallet_mismatches
                .iter()
                .take(sample)
                .map(|m| format!("{} expected {} actual {}", m.user, m.expected, m.actual))
                .collect();
            failures.push(format!(
                "Wallet delta mismatch: {} users have balances that do not map to their \
                 transaction history [{}]",
                self.wallet_mismatches.len(),
                examples.join("; ")
            ));
        }
        failures
    }
}

/// Scan the store. Light scans check at most `scan_limit` transactions for
/// missing users; deep scans check all of them and every wallet.
pub fn scan_economy(c: &Collections, deep: bool, scan_limit: usize) -> EconomyFindings {
    let completed: Vec<_> = c.transactions().iter().filter(|tx| tx.is_completed()).collect();

    let supply = SupplySnapshot {
        wallets: c.competitors.values().map(|u| u.wallet_balance).sum(),
        transactions: completed.iter().map(|tx| tx.amount).sum(),
    };

    let user_scan = if deep { completed.len() } else { scan_limit };
    let orphaned_users = completed
        .iter()
        .take(user_scan)
        .filter(|tx| !c.competitors.contains_key(&tx.user))
        .count();
    let orphaned_tournaments = completed
        .iter()
        .filter_map(|tx| tx.tournament())
        .filter(|t| !c.tournaments.contains_key(t))
        .count();

    let mut bindings: BTreeMap<(UserId, TournamentId, TransactionKind), usize> = BTreeMap::new();
    for tx in completed.iter().filter(|tx| tx.kind.is_tournament_binding()) {
        if let Some(t) = tx.tournament() {
            *bindings.entry((tx.user, t, tx.kind)).or_default() += 1;
        }
    }
    let duplicate_bindings = bindings
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((user, tournament, kind), count)| DuplicateBinding {
            user,
            tournament,
            kind,
            count,
        })
        .collect();

    let wallet_mismatches = if deep {
        let mut expected: BTreeMap<UserId, i64> = BTreeMap::new();
        for tx in &completed {
            *expected.entry(tx.user).or_default() += tx.amount;
        }
        c.competitors
            .values()
            .filter_map(|u| {
                let expected = expected.get(&u.id).copied().unwrap_or(0);
                (expected != u.wallet_balance).then_some(WalletMismatch {
                    user: u.id,
                    expected,
                    actual: u.wallet_balance,
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    EconomyFindings {
        supply,
        orphaned_users,
        orphaned_tournaments,
        duplicate_bindings,
        wallet_mismatches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{Competitor, Transaction, TransactionReference};

    fn deposit(c: &mut Collections, user: &Competitor, amount: i64) {
        c.insert_transaction(Transaction::completed(
            user.id,
            TransactionKind::Deposit,
            amount,
            0,
            None,
            Utc::now(),
        ))
        .unwrap();
    }

    #[test]
    fn test_clean_economy_has_no_failures() {
        let mut c = Collections::default();
        let mut alice = Competitor::new("alice");
        alice.wallet_balance = 500;
        deposit(&mut c, &alice, 500);
        c.put_competitor(alice);

        let findings = scan_economy(&c, true, 10_000);
        assert!(findings.failures(5).is_empty());
        assert_eq!(findings.supply.wallets, 500);
    }

    #[test]
    fn test_offsetting_corruption_only_caught_by_deep_scan() {
        let mut c = Collections::default();
        let mut alice = Competitor::new("alice");
        let mut bob = Competitor::new("bob");
        deposit(&mut c, &alice, 300);
        deposit(&mut c, &bob, 300);
        // 100 moved between wallets with no transaction: totals still agree.
        alice.wallet_balance = 400;
        bob.wallet_balance = 200;
        c.put_competitor(alice);
        c.put_competitor(bob);

        assert!(scan_economy(&c, false, 10_000).failures(5).is_empty());

        let deep = scan_economy(&c, true, 10_000);
        assert_eq!(deep.wallet_mismatches.len(), 2);
        assert_eq!(deep.failures(5).len(), 1);
    }

    #[test]
    fn test_orphans_and_duplicate_bindings() {
        let mut c = Collections::default();
        let ghost = Competitor::new("ghost");
        let tournament = TournamentId::new();
        for _ in 0..2 {
            c.insert_transaction(Transaction::completed(
                ghost.id,
                TransactionKind::EntryFee,
                -50,
                100,
                Some(TransactionReference::Tournament(tournament)),
                Utc::now(),
            ))
            .unwrap();
        }
        // Failed attempts are ignored.
        c.insert_transaction(Transaction::failed(
            UserId::new(),
            TransactionKind::PrizePayout,
            700,
            0,
            Some(TransactionReference::Tournament(TournamentId::new())),
            "USER_NOT_FOUND",
            Utc::now(),
        ))
        .unwrap();

        let findings = scan_economy(&c, false, 10_000);
        assert_eq!(findings.orphaned_users, 2);
        assert_eq!(findings.orphaned_tournaments, 2);
        assert_eq!(findings.duplicate_bindings.len(), 1);
        assert_eq!(findings.duplicate_bindings[0].count, 2);
        assert!(!findings.supply.is_conserved());
        assert_eq!(findings.failures(5).len(), 4);
    }
}
