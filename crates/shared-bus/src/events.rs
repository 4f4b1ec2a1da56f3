//! # Platform Events
//!
//! Notifications broadcast after a state change has been committed.
//! Delivery (websocket push, email) is handled outside the core.

use serde::{Deserialize, Serialize};
use shared_types::{SystemStateKind, TournamentId, UserId};

/// Every notification the core can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// New matches were created for `round`.
    BracketAdvanced { tournament: TournamentId, round: u32 },

    /// The final was decided and the tournament closed.
    TournamentCompleted {
        tournament: TournamentId,
        winner: UserId,
    },

    /// The system-state controller changed mode.
    SystemStateChanged {
        previous: SystemStateKind,
        next: SystemStateKind,
        reason: String,
    },
}

impl PlatformEvent {
    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            PlatformEvent::BracketAdvanced { .. } => "bracket_advanced",
            PlatformEvent::TournamentCompleted { .. } => "tournament_completed",
            PlatformEvent::SystemStateChanged { .. } => "system_state_changed",
        }
    }
}
