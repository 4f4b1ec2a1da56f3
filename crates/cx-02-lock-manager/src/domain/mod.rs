//! Lease arithmetic

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

/// Fixed clock-drift allowance added on top of the proportional drift.
const DRIFT_CONSTANT: Duration = Duration::from_millis(2);

/// Random owner token. Only the holder of the token can extend or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockToken(pub Uuid);

impl LockToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nodes that must agree: `n/2 + 1`.
pub fn quorum(nodes: usize) -> usize {
    nodes / 2 + 1
}

/// Remaining safe lease time after acquisition took `elapsed`.
///
/// `None` when clock drift and acquisition latency consumed the whole TTL.
pub fn validity(ttl: Duration, elapsed: Duration, drift_factor: f64) -> Option<Duration> {
    let drift = ttl.mul_f64(drift_factor) + DRIFT_CONSTANT;
    ttl.checked_sub(elapsed)?
        .checked_sub(drift)
        .filter(|v| !v.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum() {
        assert_eq!(quorum(1), 1);
        assert_eq!(quorum(2), 2);
        assert_eq!(quorum(3), 2);
        assert_eq!(quorum(5), 3);
    }

    #[test]
    fn test_validity_subtracts_drift() {
        let v = validity(Duration::from_millis(5000), Duration::from_millis(100), 0.01).unwrap();
        // 5000 - 100 - (50 + 2)
        assert_eq!(v, Duration::from_millis(4848));
    }

    #[test]
    fn test_validity_exhausted() {
        assert!(validity(Duration::from_millis(100), Duration::from_millis(99), 0.01).is_none());
    }
}
