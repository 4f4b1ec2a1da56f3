//! Suspicion decay.

use chrono::{DateTime, Duration, Utc};
use shared_types::IntegrityRecord;

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Decay `record` in place. Returns the amount removed, if any.
///
/// Nothing happens until `period` has passed since the last increase. After
/// that the score is multiplied by `(1 - rate)` once per full period since
/// the later of the last increase and the last decay.
pub fn apply_decay(
    record: &mut IntegrityRecord,
    now: DateTime<Utc>,
    period: Duration,
    rate: f64,
) -> Option<f64> {
    if record.suspicion_score <= 0.0 || period.num_seconds() <= 0 {
        return None;
    }
    let increased = record.last_suspicion_increase_at?;
    if now - increased < period {
        return None;
    }

    let anchor = record
        .last_suspicion_decay_at
        .map_or(increased, |decayed| decayed.max(increased));
    let periods = (now - anchor).num_seconds() / period.num_seconds();
    if periods < 1 {
        return None;
    }

    let before = record.suspicion_score;
    let factor = (1.0 - rate).powi(i32::try_from(periods).unwrap_or(i32::MAX));
    record.suspicion_score = round2(before * factor).max(0.0);
    record.last_suspicion_decay_at = Some(anchor + period * periods as i32);
    Some(before - record.suspicion_score)
}
