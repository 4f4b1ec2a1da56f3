//! Production invariant checks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shared_store::Collections;

/// Counts of records violating a production invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvariantFindings {
    pub negative_wallets: usize,
    pub negative_ratings: usize,
    pub tournaments_with_duplicates: usize,
    /// Age of the last state evaluation, in milliseconds, when over the limit.
    pub stale_state_ms: Option<i64>,
}

impl InvariantFindings {
    pub fn failures(&self) -> Vec<String> {
        let mut failures = Vec::new();
        if self.negative_wallets > 0 {
            failures.push(format!(
                "Wallet integrity failed: {} users have negative balances",
                self.negative_wallets
            ));
        }
        if self.negative_ratings > 0 {
            failures.push(format!(
                "Ranking integrity failed: {} users have negative rating points",
                self.negative_ratings
            ));
        }
        if self.tournaments_with_duplicates > 0 {
            failures.push(format!(
                "Bracket uniqueness failed: {} tournaments have duplicate participants",
                self.tournaments_with_duplicates
            ));
        }
        if let Some(ms) = self.stale_state_ms {
            failures.push(format!(
                "State evaluation freshness failed: last system check was {ms}ms ago"
            ));
        }
        failures
    }
}

/// Store-side invariants. Freshness is filled in by the caller.
pub fn scan_invariants(c: &Collections) -> InvariantFindings {
    InvariantFindings {
        negative_wallets: c
            .competitors
            .values()
            .filter(|u| u.wallet_balance < 0)
            .count(),
        negative_ratings: c
            .competitors
            .values()
            .filter(|u| u.stats.rating_points < 0)
            .count(),
        tournaments_with_duplicates: c
            .tournaments
            .values()
            .filter(|t| t.participants.iter().collect::<BTreeSet<_>>().len() != t.participants.len())
            .count(),
        stale_state_ms: None,
    }
}
