//! Ledger domain types

use serde::{Deserialize, Serialize};
use shared_store::Fence;
use shared_types::{MatchId, UserId};

/// Which kind of effect a fence guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerScope {
    /// Rating update of one competitor for one match.
    Ranking,
    /// Integrity analysis of one competitor for one match.
    Integrity,
}

impl LedgerScope {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerScope::Ranking => "ranking",
            LedgerScope::Integrity => "integrity",
        }
    }
}

/// One `(scope, subject, event)` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerEntry {
    pub scope: LedgerScope,
    pub subject: UserId,
    pub event: MatchId,
}

impl LedgerEntry {
    pub fn ranking(subject: UserId, event: MatchId) -> Self {
        Self {
            scope: LedgerScope::Ranking,
            subject,
            event,
        }
    }

    pub fn integrity(subject: UserId, event: MatchId) -> Self {
        Self {
            scope: LedgerScope::Integrity,
            subject,
            event,
        }
    }

    pub fn fence(&self) -> Fence {
        Fence {
            scope: self.scope.as_str(),
            subject: self.subject.0,
            event: self.event.0,
        }
    }
}

/// Result of `record_once`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// `false` means the effect was already applied: skip it.
    pub created: bool,
}

impl RecordOutcome {
    pub fn created() -> Self {
        Self { created: true }
    }

    pub fn already_applied() -> Self {
        Self { created: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_produce_distinct_fences() {
        let (u, m) = (UserId::new(), MatchId::new());
        assert_ne!(
            LedgerEntry::ranking(u, m).fence(),
            LedgerEntry::integrity(u, m).fence()
        );
    }
}
