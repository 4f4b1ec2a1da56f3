use cx_04_escrow::PayoutReceipt;
use serde::{Deserialize, Serialize};
use shared_types::{MatchId, TournamentId, UserId};

/// One step of the advancement work-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceStep {
    /// The round still has unfinished matches.
    RoundPending { round: u32 },
    /// The next round already exists (redelivered event).
    AlreadyAdvanced { round: u32 },
    /// Matches for `round` were created.
    Advanced {
        round: u32,
        created: Vec<MatchId>,
        byes: usize,
    },
    /// The final was decided.
    Finalized {
        winner: UserId,
        payout: PayoutReceipt,
    },
    /// The final was decided but payouts are frozen; the prize is still owed.
    PayoutFrozen { winner: UserId, reason: String },
}

/// Result of one `advance` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceOutcome {
    /// The match is not part of a tournament.
    NotInTournament,
    /// Another worker holds the tournament lock.
    LockBusy { tournament: TournamentId },
    Processed {
        tournament: TournamentId,
        steps: Vec<AdvanceStep>,
    },
}

impl AdvanceOutcome {
    pub fn steps(&self) -> &[AdvanceStep] {
        match self {
            AdvanceOutcome::Processed { steps, .. } => steps,
            _ => &[],
        }
    }

    /// Reason the prize payout was held back, if it was.
    pub fn payout_frozen(&self) -> Option<&str> {
        self.steps().iter().find_map(|s| match s {
            AdvanceStep::PayoutFrozen { reason, .. } => Some(reason.as_str()),
            _ => None,
        })
    }

    /// Champion, when this call finalized the tournament.
    pub fn champion(&self) -> Option<UserId> {
        self.steps().iter().find_map(|s| match s {
            AdvanceStep::Finalized { winner, .. } => Some(*winner),
            _ => None,
        })
    }
}

/// Result of seeding round 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOutcome {
    pub tournament: TournamentId,
    pub matches: Vec<MatchId>,
    /// False when round 1 already existed.
    pub created: bool,
}
