//! Elo arithmetic. No I/O.

use shared_types::{expected_score, round_half_up};

/// K-factor multiplier from the score differential of a round-based game.
///
/// `1 + |winner - loser| / divisor`, capped at `max`. 13-0 gives 1.5,
/// 13-11 gives about 1.08.
pub fn margin_multiplier(winner_score: i64, loser_score: i64, divisor: f64, max: f64) -> f64 {
    let diff = (winner_score - loser_score).unsigned_abs() as f64;
    (1.0 + diff / divisor).min(max)
}

/// `(winner_delta, loser_delta)` given the winner's expected score.
pub fn duel_deltas(k: f64, winner_expected: f64) -> (i64, i64) {
    let loser_expected = 1.0 - winner_expected;
    (
        round_half_up(k * (1.0 - winner_expected)),
        round_half_up(k * (0.0 - loser_expected)),
    )
}

/// Normalized placement: 1.0 for first, 0.0 for last.
///
/// Placements outside `1..=players` are clamped; a missing placement is last.
pub fn placement_score(players: usize, placement: Option<u32>) -> f64 {
    if players <= 1 {
        return 1.0;
    }
    let n = players as f64;
    let rank = placement.map_or(n, |p| f64::from(p).clamp(1.0, n));
    (n - rank) / (n - 1.0)
}

/// Delta for one player of a placement lobby.
pub fn placement_delta(k: f64, actual: f64, rating: i64, lobby_average: f64) -> i64 {
    let expected = expected_score(rating as f64, lobby_average);
    round_half_up(k * (actual - expected))
}
