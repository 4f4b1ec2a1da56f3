//! Hysteresis state machine.
//!
//! ```text
//!            static degraded / depth ≥ 500          static critical / failed ≥ 50
//! [NORMAL] ──────────────────────────────→ [DEGRADED] ──────────────────────────→ [CRITICAL]
//!    ↑  ↑   no marker, depth < 350, failed < 50  │                                    │
//!    │  └────────────────────────────────────────┘                                    │
//!    │                     no critical marker, failed < 20 (and normal bounds hold)   │
//!    └────────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Enter thresholds are stricter than return thresholds so a metric hovering
//! around one boundary does not flap the state.

use serde::{Deserialize, Serialize};
use shared_types::{RiskMetrics, SystemStateKind};

/// Degraded and critical levels of one static risk marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerLevels {
    pub degraded: u64,
    pub critical: u64,
}

impl MarkerLevels {
    pub const fn new(degraded: u64, critical: u64) -> Self {
        Self { degraded, critical }
    }
}

/// Hysteresis bounds and static marker levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HysteresisThresholds {
    pub degraded_queue_depth_enter: u64,
    pub normal_queue_depth_return: u64,
    pub critical_failed_jobs_enter: u64,
    pub degraded_failed_jobs_return: u64,
    pub suspicion_spike: MarkerLevels,
    pub ledger_conflicts: MarkerLevels,
    pub failed_payouts: MarkerLevels,
}

impl Default for HysteresisThresholds {
    fn default() -> Self {
        Self {
            degraded_queue_depth_enter: 500,
            normal_queue_depth_return: 350,
            critical_failed_jobs_enter: 50,
            degraded_failed_jobs_return: 20,
            suspicion_spike: MarkerLevels::new(5, 15),
            ledger_conflicts: MarkerLevels::new(2, 10),
            failed_payouts: MarkerLevels::new(1, 5),
        }
    }
}

impl HysteresisThresholds {
    /// Problems with the bounds, empty if usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.normal_queue_depth_return >= self.degraded_queue_depth_enter {
            problems.push(format!(
                "queue depth return threshold {} must be below enter threshold {}",
                self.normal_queue_depth_return, self.degraded_queue_depth_enter
            ));
        }
        if self.degraded_failed_jobs_return >= self.critical_failed_jobs_enter {
            problems.push(format!(
                "failed jobs return threshold {} must be below enter threshold {}",
                self.degraded_failed_jobs_return, self.critical_failed_jobs_enter
            ));
        }
        for (name, levels) in [
            ("suspicion spike", self.suspicion_spike),
            ("ledger conflicts", self.ledger_conflicts),
            ("failed payouts", self.failed_payouts),
        ] {
            if levels.degraded == 0 || levels.degraded > levels.critical {
                problems.push(format!(
                    "{name} levels must satisfy 0 < degraded ({}) <= critical ({})",
                    levels.degraded, levels.critical
                ));
            }
        }
        problems
    }
}

/// Strongest static marker that holds for a metric set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Marker {
    Clear,
    Degraded,
    Critical,
}

pub fn static_marker(metrics: &RiskMetrics, t: &HysteresisThresholds) -> Marker {
    let signals = [
        (metrics.suspicion_spike, t.suspicion_spike),
        (metrics.ledger_conflicts, t.ledger_conflicts),
        (metrics.failed_payouts, t.failed_payouts),
    ];
    if signals.iter().any(|(value, levels)| *value >= levels.critical) {
        Marker::Critical
    } else if signals.iter().any(|(value, levels)| *value >= levels.degraded) {
        Marker::Degraded
    } else {
        Marker::Clear
    }
}

/// A state change and its trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub next: SystemStateKind,
    pub reason: &'static str,
}

pub const REASON_CRITICAL_MARKERS: &str = "Critical markers detected";
pub const REASON_FAILED_JOBS: &str = "Critical failed jobs limit exceeded";
pub const REASON_ELEVATED_MARKERS: &str = "Elevated risk markers";
pub const REASON_QUEUE_DEPTH: &str = "High queue depth, operating in degraded mode";
pub const REASON_NOMINAL: &str = "All systems returned to nominal";
pub const REASON_CRITICAL_RESOLVED: &str = "Critical conditions resolved, operating in degraded mode";

/// Next state for `current` given this cycle's metrics. `None` keeps the state.
pub fn next_state(
    current: SystemStateKind,
    metrics: &RiskMetrics,
    t: &HysteresisThresholds,
) -> Option<Decision> {
    let marker = static_marker(metrics, t);
    let escalate = || {
        if marker == Marker::Critical {
            Some(Decision {
                next: SystemStateKind::Critical,
                reason: REASON_CRITICAL_MARKERS,
            })
        } else if metrics.total_failed_jobs >= t.critical_failed_jobs_enter {
            Some(Decision {
                next: SystemStateKind::Critical,
                reason: REASON_FAILED_JOBS,
            })
        } else {
            None
        }
    };
    let normal_bounds_hold =
        marker == Marker::Clear && metrics.max_queue_depth < t.normal_queue_depth_return;

    match current {
        SystemStateKind::Normal => escalate().or_else(|| {
            if marker == Marker::Degraded {
                Some(Decision {
                    next: SystemStateKind::Degraded,
                    reason: REASON_ELEVATED_MARKERS,
                })
            } else if metrics.max_queue_depth >= t.degraded_queue_depth_enter {
                Some(Decision {
                    next: SystemStateKind::Degraded,
                    reason: REASON_QUEUE_DEPTH,
                })
            } else {
                None
            }
        }),
        SystemStateKind::Degraded => escalate().or_else(|| {
            (normal_bounds_hold && metrics.total_failed_jobs < t.critical_failed_jobs_enter).then(
                || Decision {
                    next: SystemStateKind::Normal,
                    reason: REASON_NOMINAL,
                },
            )
        }),
        SystemStateKind::Critical => {
            if marker == Marker::Critical
                || metrics.total_failed_jobs >= t.degraded_failed_jobs_return
            {
                None
            } else if normal_bounds_hold {
                Some(Decision {
                    next: SystemStateKind::Normal,
                    reason: REASON_NOMINAL,
                })
            } else {
                Some(Decision {
                    next: SystemStateKind::Degraded,
                    reason: REASON_CRITICAL_RESOLVED,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(max_queue_depth: u64) -> RiskMetrics {
        RiskMetrics {
            max_queue_depth,
            ..RiskMetrics::default()
        }
    }

    fn failed(total_failed_jobs: u64) -> RiskMetrics {
        RiskMetrics {
            total_failed_jobs,
            ..RiskMetrics::default()
        }
    }

    fn step(current: SystemStateKind, m: RiskMetrics) -> SystemStateKind {
        next_state(current, &m, &HysteresisThresholds::default())
            .map(|d| d.next)
            .unwrap_or(current)
    }

    #[test]
    fn test_depth_between_thresholds_holds_degraded() {
        use SystemStateKind::*;
        let t = HysteresisThresholds::default();

        let d = next_state(Normal, &depth(500), &t).unwrap();
        assert_eq!(d.next, Degraded);
        assert_eq!(d.reason, REASON_QUEUE_DEPTH);

        assert_eq!(step(Degraded, depth(400)), Degraded);
        assert_eq!(step(Normal, depth(400)), Normal);
        assert_eq!(step(Degraded, depth(349)), Normal);
    }

    #[test]
    fn test_failed_jobs_escalate_from_any_state() {
        use SystemStateKind::*;
        assert_eq!(step(Normal, failed(50)), Critical);
        assert_eq!(step(Degraded, failed(50)), Critical);
        assert_eq!(step(Normal, failed(49)), Normal);
    }

    #[test]
    fn test_critical_steps_down_through_degraded() {
        use SystemStateKind::*;
        // 20 failed jobs still pins CRITICAL.
        assert_eq!(step(Critical, failed(20)), Critical);
        // Failures cleared but the queue is still deep: stop at DEGRADED.
        let m = RiskMetrics {
            total_failed_jobs: 5,
            max_queue_depth: 400,
            ..RiskMetrics::default()
        };
        assert_eq!(step(Critical, m), Degraded);
        // Everything clear: fall straight through to NORMAL in one cycle.
        assert_eq!(step(Critical, failed(5)), Normal);
    }

    #[test]
    fn test_static_markers() {
        use SystemStateKind::*;
        let t = HysteresisThresholds::default();

        let one_payout = RiskMetrics {
            failed_payouts: 1,
            ..RiskMetrics::default()
        };
        assert_eq!(static_marker(&one_payout, &t), Marker::Degraded);
        assert_eq!(step(Normal, one_payout), Degraded);
        // A degraded marker blocks the return to NORMAL.
        assert_eq!(step(Degraded, one_payout), Degraded);
        assert_eq!(step(Critical, one_payout), Degraded);

        let conflicts = RiskMetrics {
            ledger_conflicts: 10,
            ..RiskMetrics::default()
        };
        let d = next_state(Normal, &conflicts, &t).unwrap();
        assert_eq!(d.next, Critical);
        assert_eq!(d.reason, REASON_CRITICAL_MARKERS);
        assert_eq!(step(Critical, conflicts), Critical);
    }

    #[test]
    fn test_default_thresholds_are_consistent() {
        assert!(HysteresisThresholds::default().problems().is_empty());

        let inverted = HysteresisThresholds {
            normal_queue_depth_return: 600,
            ..HysteresisThresholds::default()
        };
        assert_eq!(inverted.problems().len(), 1);
    }
}
