//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: typed ids for every stored document
//! - **Competitor**: ratings, integrity record, wallet
//! - **Competition**: `Game`, `Season`, `Tournament`, `Match`
//! - **Economy**: `Transaction`
//! - **Audit**: `IntegrityLog`

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::prediction::Prediction;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Competitor (user account) identifier.
    UserId
);
entity_id!(
    /// Match identifier.
    MatchId
);
entity_id!(
    /// Tournament identifier.
    TournamentId
);
entity_id!(
    /// Game title identifier.
    GameId
);
entity_id!(
    /// Ranked season identifier.
    SeasonId
);
entity_id!(
    /// Financial transaction identifier.
    TransactionId
);

// =============================================================================
// CLUSTER B: COMPETITOR
// =============================================================================

/// Starting rating for any new per-game or per-season record.
pub const BASELINE_RATING: i64 = 1000;

/// Platform role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Player,
    Organizer,
    Admin,
}

/// Rating record for one game (or one game within one season).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    pub rating_points: i64,
    pub wins: u32,
    pub losses: u32,
    pub matches_played: u32,
}

impl StatRecord {
    /// Fresh record starting at the given rating.
    pub fn baseline(rating_points: i64) -> Self {
        Self {
            rating_points,
            wins: 0,
            losses: 0,
            matches_played: 0,
        }
    }

    /// Wins divided by matches played (0 when no matches).
    pub fn win_rate(&self) -> f64 {
        f64::from(self.wins) / f64::from(self.matches_played.max(1))
    }

    /// Apply one rated result.
    pub fn record(&mut self, delta: i64, is_win: bool) {
        self.rating_points += delta;
        self.matches_played += 1;
        if is_win {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
    }
}

impl Default for StatRecord {
    fn default() -> Self {
        Self::baseline(BASELINE_RATING)
    }
}

/// A point on the lifetime rating history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub rating: i64,
    pub at: DateTime<Utc>,
}

/// Lifetime aggregate mirror across every game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub rating_points: i64,
    pub wins: u32,
    pub losses: u32,
    pub matches_played: u32,
    /// Win percentage, 0..=100.
    pub consistency: u32,
    pub rating_history: Vec<RatingSnapshot>,
}

impl Default for LifetimeStats {
    fn default() -> Self {
        Self {
            rating_points: BASELINE_RATING,
            wins: 0,
            losses: 0,
            matches_played: 0,
            consistency: 0,
            rating_history: Vec::new(),
        }
    }
}

/// Anti-cheat bookkeeping attached to a competitor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntegrityRecord {
    pub suspicion_score: f64,
    pub is_flagged: bool,
    pub win_streak: u32,
    pub last_flagged_at: Option<DateTime<Utc>>,
    pub last_suspicion_increase_at: Option<DateTime<Utc>>,
    pub last_suspicion_decay_at: Option<DateTime<Utc>>,
}

/// Achievement awarded to a competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub name: String,
    pub description: String,
    pub awarded_at: DateTime<Utc>,
}

/// A platform account that plays matches and holds a wallet.
///
/// `wallet_balance` must never go negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub stats: LifetimeStats,
    pub game_stats: BTreeMap<GameId, StatRecord>,
    pub season_stats: BTreeMap<SeasonId, BTreeMap<GameId, StatRecord>>,
    pub integrity: IntegrityRecord,
    pub wallet_balance: i64,
    pub badges: Vec<Badge>,
}

impl Competitor {
    /// New player account with baseline ratings and an empty wallet.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            role: Role::Player,
            stats: LifetimeStats::default(),
            game_stats: BTreeMap::new(),
            season_stats: BTreeMap::new(),
            integrity: IntegrityRecord::default(),
            wallet_balance: 0,
            badges: Vec::new(),
        }
    }

    /// Per-game record, or a baseline record if the competitor never played it.
    pub fn game_record(&self, game: &GameId) -> StatRecord {
        self.game_stats.get(game).copied().unwrap_or_default()
    }

    /// Apply a rating delta to the per-game, per-season and lifetime records.
    pub fn apply_rating(
        &mut self,
        game: GameId,
        season: Option<SeasonId>,
        delta: i64,
        is_win: bool,
        at: DateTime<Utc>,
    ) {
        self.game_stats.entry(game).or_default().record(delta, is_win);

        if let Some(season) = season {
            self.season_stats
                .entry(season)
                .or_default()
                .entry(game)
                .or_default()
                .record(delta, is_win);
        }

        let stats = &mut self.stats;
        stats.rating_points += delta;
        stats.matches_played += 1;
        if is_win {
            stats.wins += 1;
        } else {
            stats.losses += 1;
        }
        stats.rating_history.push(RatingSnapshot {
            rating: stats.rating_points,
            at,
        });
        stats.consistency =
            (f64::from(stats.wins) * 100.0 / f64::from(stats.matches_played.max(1))).round() as u32;
    }
}

// =============================================================================
// CLUSTER C: COMPETITION
// =============================================================================

/// How a game's match results are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringType {
    #[default]
    WinLoss,
    RoundBased,
    PointsBased,
}

/// A game title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub scoring_type: ScoringType,
}

impl Game {
    pub fn new(name: impl Into<String>, scoring_type: ScoringType) -> Self {
        Self {
            id: GameId::new(),
            name: name.into(),
            scoring_type,
        }
    }
}

/// A ranked season. At most one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

/// Match lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    Ongoing,
    Completed,
    Disputed,
}

/// Result verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Disputed,
}

/// Structured result payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchResult {
    /// Round or point score per participant (round-based games).
    pub scores: BTreeMap<UserId, i64>,
    /// Finishing placement per participant, 1 = first (points-based games).
    pub placements: BTreeMap<UserId, u32>,
    /// Synthetic auto-advance with no opponent.
    pub is_bye: bool,
}

/// A single game between two or more competitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament: Option<TournamentId>,
    pub round: u32,
    /// Stable pairing key within a round (0-based bracket slot).
    pub bracket_position: u32,
    pub participants: Vec<UserId>,
    pub winner: Option<UserId>,
    pub status: MatchStatus,
    pub verification_status: VerificationStatus,
    pub result: MatchResult,
    /// Display summary, e.g. "13-11" or "Bye".
    pub score: Option<String>,
    pub prediction: Option<Prediction>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// A scheduled match waiting to be played.
    pub fn scheduled(
        tournament: Option<TournamentId>,
        round: u32,
        bracket_position: u32,
        participants: Vec<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MatchId::new(),
            tournament,
            round,
            bracket_position,
            participants,
            winner: None,
            status: MatchStatus::Scheduled,
            verification_status: VerificationStatus::Pending,
            result: MatchResult::default(),
            score: None,
            prediction: None,
            created_at: now,
            completed_at: None,
        }
    }

    /// An already-completed match auto-advancing `player`.
    pub fn bye(
        tournament: TournamentId,
        round: u32,
        bracket_position: u32,
        player: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MatchId::new(),
            tournament: Some(tournament),
            round,
            bracket_position,
            participants: vec![player],
            winner: Some(player),
            status: MatchStatus::Completed,
            verification_status: VerificationStatus::Verified,
            result: MatchResult {
                is_bye: true,
                ..MatchResult::default()
            },
            score: Some("Bye".to_string()),
            prediction: None,
            created_at: now,
            completed_at: Some(now),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    pub fn is_bye(&self) -> bool {
        self.result.is_bye
    }

    /// The first participant that is not the winner.
    pub fn loser(&self) -> Option<UserId> {
        let winner = self.winner?;
        self.participants.iter().copied().find(|p| *p != winner)
    }
}

/// Tournament lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
}

/// A single-elimination tournament. The bracket is implicit in the
/// `round` field of its matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub game: GameId,
    pub season: Option<SeasonId>,
    /// Ordered set, registration order.
    pub participants: Vec<UserId>,
    pub matches: Vec<MatchId>,
    pub status: TournamentStatus,
    pub max_participants: u32,
    pub entry_fee: i64,
    pub base_prize_pool: i64,
    pub created_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Tournament {
    pub fn new(name: impl Into<String>, game: GameId, now: DateTime<Utc>) -> Self {
        Self {
            id: TournamentId::new(),
            name: name.into(),
            game,
            season: None,
            participants: Vec::new(),
            matches: Vec::new(),
            status: TournamentStatus::Upcoming,
            max_participants: 64,
            entry_fee: 0,
            base_prize_pool: 0,
            created_at: now,
            end_date: None,
        }
    }

    /// `base_prize_pool + participants * entry_fee`, before any cap.
    pub fn prize_pool(&self) -> i64 {
        let participants = i64::try_from(self.participants.len()).unwrap_or(i64::MAX);
        self.base_prize_pool
            .saturating_add(participants.saturating_mul(self.entry_fee))
    }

    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }
}

// =============================================================================
// CLUSTER D: ECONOMY
// =============================================================================

/// Kind of money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    EntryFee,
    PrizePayout,
    Refund,
}

impl TransactionKind {
    /// Kinds that may bind a user to a tournament at most once.
    pub fn is_tournament_binding(self) -> bool {
        matches!(
            self,
            TransactionKind::EntryFee | TransactionKind::PrizePayout | TransactionKind::Refund
        )
    }
}

/// Settlement status of a transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

/// What a transaction refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionReference {
    Tournament(TournamentId),
    External(String),
}

impl TransactionReference {
    pub fn tournament(&self) -> Option<TournamentId> {
        match self {
            TransactionReference::Tournament(id) => Some(*id),
            TransactionReference::External(_) => None,
        }
    }
}

/// Immutable financial record. `amount` is signed: debits are negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user: UserId,
    pub kind: TransactionKind,
    pub amount: i64,
    pub previous_balance: i64,
    pub new_balance: i64,
    pub reference: Option<TransactionReference>,
    pub idempotency_key: Option<String>,
    pub status: TransactionStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A completed balance movement.
    pub fn completed(
        user: UserId,
        kind: TransactionKind,
        amount: i64,
        previous_balance: i64,
        reference: Option<TransactionReference>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user,
            kind,
            amount,
            previous_balance,
            new_balance: previous_balance + amount,
            reference,
            idempotency_key: None,
            status: TransactionStatus::Completed,
            notes: String::new(),
            created_at: at,
        }
    }

    /// A failed attempt. Balance fields are left equal; it never counts toward supply.
    pub fn failed(
        user: UserId,
        kind: TransactionKind,
        amount: i64,
        balance: i64,
        reference: Option<TransactionReference>,
        notes: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user,
            kind,
            amount,
            previous_balance: balance,
            new_balance: balance,
            reference,
            idempotency_key: None,
            status: TransactionStatus::Failed,
            notes: notes.into(),
            created_at: at,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    pub fn tournament(&self) -> Option<TournamentId> {
        self.reference.as_ref().and_then(TransactionReference::tournament)
    }
}

// =============================================================================
// CLUSTER E: AUDIT
// =============================================================================

/// Context captured when a suspicion increase was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegritySnapshot {
    pub winner_probability: f64,
    pub prediction_available: bool,
    pub win_streak: u32,
    pub suspicion_score: f64,
}

/// Immutable record of a positive suspicion delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityLog {
    pub user: UserId,
    pub match_id: MatchId,
    pub reasons: Vec<String>,
    pub score_delta: f64,
    pub snapshot: IntegritySnapshot,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_rating_updates_all_records() {
        let mut c = Competitor::new("alice");
        let game = GameId::new();
        let season = SeasonId::new();
        let now = Utc::now();

        c.apply_rating(game, Some(season), 16, true, now);

        assert_eq!(c.game_record(&game).rating_points, 1016);
        assert_eq!(c.game_record(&game).wins, 1);
        assert_eq!(c.season_stats[&season][&game].rating_points, 1016);
        assert_eq!(c.stats.rating_points, 1016);
        assert_eq!(c.stats.consistency, 100);
        assert_eq!(c.stats.rating_history.len(), 1);
    }

    #[test]
    fn test_season_record_starts_fresh() {
        let mut c = Competitor::new("bob");
        let game = GameId::new();
        c.game_stats.insert(game, StatRecord::baseline(1400));

        let season = SeasonId::new();
        c.apply_rating(game, Some(season), -10, false, Utc::now());

        assert_eq!(c.game_record(&game).rating_points, 1390);
        assert_eq!(c.season_stats[&season][&game].rating_points, 990);
    }

    #[test]
    fn test_bye_match_is_completed() {
        let player = UserId::new();
        let m = Match::bye(TournamentId::new(), 2, 0, player, Utc::now());
        assert!(m.is_completed());
        assert!(m.is_bye());
        assert_eq!(m.winner, Some(player));
        assert_eq!(m.loser(), None);
    }

    #[test]
    fn test_prize_pool() {
        let mut t = Tournament::new("cup", GameId::new(), Utc::now());
        t.base_prize_pool = 500;
        t.entry_fee = 100;
        t.participants = vec![UserId::new(), UserId::new(), UserId::new()];
        assert_eq!(t.prize_pool(), 800);
    }

    #[test]
    fn test_win_rate_without_matches() {
        assert_eq!(StatRecord::default().win_rate(), 0.0);
    }
}
