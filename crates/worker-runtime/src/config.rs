//! # Platform Configuration
//!
//! Every subsystem's guardrails in one place. Defaults carry the production
//! values; `CX_*` environment variables override individual fields.
//!
//! ## Validation
//!
//! - Hysteresis enter thresholds must be stricter than return thresholds
//! - Monetary caps must be positive
//! - Schedule intervals must be non-zero

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use cx_02_lock_manager::LockConfig;
use cx_03_ranking::RankingConfig;
use cx_04_escrow::EscrowConfig;
use cx_05_bracket::BracketConfig;
use cx_06_integrity::IntegrityConfig;
use cx_07_system_state::SystemStateConfig;
use cx_08_reconciliation::ReconciliationConfig;
use shared_bus::{
    JobOptions, CHECK_SEASONS_JOB, DEEP_AUDIT_JOB, EVALUATE_STATE_JOB, INTEGRITY_QUEUE,
    INVARIANT_AUDIT_JOB, LIGHT_AUDIT_JOB, RANKING_QUEUE, SEASON_QUEUE, SYSTEM_QUEUE,
    TOURNAMENT_QUEUE,
};
use thiserror::Error;

/// Complete platform configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Identifier of this worker process, used in logs.
    pub worker_id: String,
    pub escrow: EscrowConfig,
    pub ranking: RankingConfig,
    pub integrity: IntegrityConfig,
    pub bracket: BracketConfig,
    pub locks: LockConfig,
    /// Independent lock nodes; a lease needs a majority.
    pub lock_nodes: usize,
    pub system_state: SystemStateConfig,
    pub reconciliation: ReconciliationConfig,
    pub queues: Vec<QueueTuning>,
    /// How often idle workers re-check delayed jobs.
    pub poll_interval: Duration,
    pub prediction: PredictionSettings,
    pub schedule: Vec<ScheduledJob>,
    /// Lifetime of a chaos drill when the operator gives none.
    pub chaos_ttl: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            worker_id: "worker-local".to_string(),
            escrow: EscrowConfig::default(),
            ranking: RankingConfig::default(),
            integrity: IntegrityConfig::default(),
            bracket: BracketConfig::default(),
            locks: LockConfig::default(),
            lock_nodes: 3,
            system_state: SystemStateConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            queues: QueueTuning::platform_defaults(),
            poll_interval: Duration::from_millis(100),
            prediction: PredictionSettings::default(),
            schedule: ScheduledJob::platform_defaults(),
            chaos_ttl: shared_types::chaos::DEFAULT_CHAOS_TTL,
        }
    }
}

/// Delivery options and parallelism of one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTuning {
    pub name: &'static str,
    pub options: JobOptions,
    /// Jobs processed in parallel by this process.
    pub concurrency: usize,
}

impl QueueTuning {
    pub fn platform_defaults() -> Vec<Self> {
        vec![
            Self {
                name: RANKING_QUEUE,
                options: JobOptions::match_processing(),
                concurrency: 8,
            },
            Self {
                name: INTEGRITY_QUEUE,
                options: JobOptions::match_processing(),
                concurrency: 4,
            },
            Self {
                name: TOURNAMENT_QUEUE,
                options: JobOptions::bracket_advancement(),
                concurrency: 2,
            },
            Self {
                name: SYSTEM_QUEUE,
                options: JobOptions::default(),
                concurrency: 1,
            },
            Self {
                name: SEASON_QUEUE,
                options: JobOptions::default(),
                concurrency: 1,
            },
        ]
    }
}

/// Win-probability service client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionSettings {
    /// `None` runs without the service; callers use the Elo fallback.
    pub url: Option<String>,
    pub timeout: Duration,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(1),
        }
    }
}

/// A periodic job enqueued by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledJob {
    pub job: &'static str,
    pub queue: &'static str,
    pub every: Duration,
}

impl ScheduledJob {
    pub fn platform_defaults() -> Vec<Self> {
        const HOUR: u64 = 60 * 60;
        vec![
            Self {
                job: EVALUATE_STATE_JOB,
                queue: SYSTEM_QUEUE,
                every: Duration::from_secs(15),
            },
            Self {
                job: LIGHT_AUDIT_JOB,
                queue: SYSTEM_QUEUE,
                every: Duration::from_secs(6 * HOUR),
            },
            Self {
                job: DEEP_AUDIT_JOB,
                queue: SYSTEM_QUEUE,
                every: Duration::from_secs(24 * HOUR),
            },
            Self {
                job: INVARIANT_AUDIT_JOB,
                queue: SYSTEM_QUEUE,
                every: Duration::from_secs(24 * HOUR),
            },
            Self {
                job: CHECK_SEASONS_JOB,
                queue: SEASON_QUEUE,
                every: Duration::from_secs(HOUR),
            },
        ]
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid hysteresis thresholds: {}", .0.join("; "))]
    InvalidThresholds(Vec<String>),

    #[error("{name} must be positive, got {value}")]
    NonPositiveCap { name: &'static str, value: i64 },

    #[error("Interval of {0} must be non-zero")]
    ZeroInterval(&'static str),

    #[error("At least one lock node is required")]
    NoLockNodes,
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl PlatformConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by a fixed set of variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(id) = lookup("CX_WORKER_ID").filter(|id| !id.is_empty()) {
            config.worker_id = id;
        }

        if let Some(v) = parse(&lookup, "CX_MAX_ENTRY_FEE") {
            config.escrow.max_entry_fee = v;
        }
        if let Some(v) = parse(&lookup, "CX_MAX_PRIZE_PAYOUT") {
            config.escrow.max_prize_payout = v;
        }
        if let Some(v) = parse(&lookup, "CX_MAX_DAILY_TRANSFER") {
            config.escrow.max_daily_transfer = v;
        }

        let thresholds = &mut config.system_state.thresholds;
        if let Some(v) = parse(&lookup, "CX_QUEUE_DEPTH_ENTER") {
            thresholds.degraded_queue_depth_enter = v;
        }
        if let Some(v) = parse(&lookup, "CX_QUEUE_DEPTH_RETURN") {
            thresholds.normal_queue_depth_return = v;
        }
        if let Some(v) = parse(&lookup, "CX_FAILED_JOBS_ENTER") {
            thresholds.critical_failed_jobs_enter = v;
        }
        if let Some(v) = parse(&lookup, "CX_FAILED_JOBS_RETURN") {
            thresholds.degraded_failed_jobs_return = v;
        }
        if let Some(secs) = parse(&lookup, "CX_EVALUATE_INTERVAL_SECS") {
            let every = Duration::from_secs(secs);
            config.system_state.evaluation_interval = every;
            for job in config
                .schedule
                .iter_mut()
                .filter(|j| j.job == EVALUATE_STATE_JOB)
            {
                job.every = every;
            }
        }

        if let Some(v) = parse::<f64>(&lookup, "CX_SUSPICION_THRESHOLD") {
            config.integrity.suspicion_threshold = v;
            config.system_state.suspicion_threshold = v;
        }

        if let Some(url) = lookup("CX_PREDICTION_URL").filter(|u| !u.is_empty()) {
            config.prediction.url = Some(url);
        }
        if let Some(ms) = parse(&lookup, "CX_PREDICTION_TIMEOUT_MS") {
            config.prediction.timeout = Duration::from_millis(ms);
        }

        if let Some(n) = parse(&lookup, "CX_LOCK_NODES") {
            config.lock_nodes = n;
        }
        if let Some(secs) = parse(&lookup, "CX_CHAOS_TTL_SECS") {
            config.chaos_ttl = Duration::from_secs(secs);
        }

        config
    }

    /// Reject configurations the subsystems cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems = self.system_state.thresholds.problems();
        if !problems.is_empty() {
            return Err(ConfigError::InvalidThresholds(problems));
        }

        let caps = [
            ("max_entry_fee", self.escrow.max_entry_fee),
            ("max_prize_payout", self.escrow.max_prize_payout),
            ("max_daily_transfer", self.escrow.max_daily_transfer),
        ];
        if let Some((name, value)) = caps.into_iter().find(|(_, v)| *v <= 0) {
            return Err(ConfigError::NonPositiveCap { name, value });
        }

        if let Some(job) = self.schedule.iter().find(|j| j.every.is_zero()) {
            return Err(ConfigError::ZeroInterval(job.job));
        }
        if self.system_state.evaluation_interval.is_zero() {
            return Err(ConfigError::ZeroInterval(EVALUATE_STATE_JOB));
        }
        if self.lock_nodes == 0 {
            return Err(ConfigError::NoLockNodes);
        }
        Ok(())
    }

    /// Tuning of a queue, if declared.
    pub fn queue(&self, name: &str) -> Option<&QueueTuning> {
        self.queues.iter().find(|q| q.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PlatformConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.escrow.max_daily_transfer, 20_000);
        assert_eq!(config.queue(TOURNAMENT_QUEUE).unwrap().options.attempts, 5);
        assert_eq!(config.schedule.len(), 5);
    }

    #[test]
    fn test_overrides_applied() {
        let config = PlatformConfig::from_vars(&vars(&[
            ("CX_WORKER_ID", "w7"),
            ("CX_MAX_ENTRY_FEE", "2500"),
            ("CX_QUEUE_DEPTH_ENTER", "800"),
            ("CX_EVALUATE_INTERVAL_SECS", "5"),
            ("CX_PREDICTION_URL", "http://predict:8000/predict"),
            ("CX_SUSPICION_THRESHOLD", "not-a-number"),
        ]));

        assert_eq!(config.worker_id, "w7");
        assert_eq!(config.escrow.max_entry_fee, 2_500);
        assert_eq!(config.system_state.thresholds.degraded_queue_depth_enter, 800);
        assert_eq!(config.system_state.evaluation_interval, Duration::from_secs(5));
        let evaluate = config
            .schedule
            .iter()
            .find(|j| j.job == EVALUATE_STATE_JOB)
            .unwrap();
        assert_eq!(evaluate.every, Duration::from_secs(5));
        assert_eq!(
            config.prediction.url.as_deref(),
            Some("http://predict:8000/predict")
        );
        // Unparseable values keep the default.
        assert_eq!(config.integrity.suspicion_threshold, 50.0);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = PlatformConfig::from_vars(&vars(&[
            ("CX_QUEUE_DEPTH_ENTER", "300"),
            ("CX_QUEUE_DEPTH_RETURN", "350"),
        ]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds(_))
        ));
    }

    #[test]
    fn test_non_positive_cap_rejected() {
        let config = PlatformConfig::from_vars(&vars(&[("CX_MAX_DAILY_TRANSFER", "0")]));
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveCap {
                name: "max_daily_transfer",
                value: 0
            })
        );
    }
}
