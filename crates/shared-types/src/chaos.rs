//! Fault injection for chaos drills.
//!
//! Disabled unless explicitly enabled, and always with a TTL so a forgotten
//! drill switches itself off. When active, each injection point fails with
//! 20% probability and otherwise stalls 100-3000 ms with 30% probability.

use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, warn};

use crate::errors::{Classify, ErrorClass};

/// Default time a drill stays enabled.
pub const DEFAULT_CHAOS_TTL: Duration = Duration::from_secs(10 * 60);

const FAULT_PROBABILITY: f64 = 0.2;
const LATENCY_PROBABILITY: f64 = 0.3;
const MIN_LATENCY_MS: u64 = 100;
const MAX_LATENCY_MS: u64 = 3000;

/// Simulated fault raised at an injection point.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Simulated fatal fault in {context} (correlation {correlation_id})")]
pub struct InjectedFault {
    pub context: String,
    pub correlation_id: String,
}

impl Classify for InjectedFault {
    fn class(&self) -> ErrorClass {
        ErrorClass::Transient
    }
}

/// Shared chaos switch, handed to every service with injection points.
#[derive(Debug, Default)]
pub struct FaultInjector {
    active_until: Mutex<Option<Instant>>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the drill. Returns the resulting status.
    pub fn toggle(&self, enabled: bool, ttl: Duration) -> bool {
        let mut until = self.active_until.lock();
        if enabled {
            *until = Some(Instant::now() + ttl);
            warn!(ttl_secs = ttl.as_secs(), "[chaos] Fault injection ACTIVE");
        } else {
            *until = None;
            warn!("[chaos] Fault injection disabled manually");
        }
        enabled
    }

    /// Whether injection points currently fire. Expired drills turn off here.
    pub fn is_active(&self) -> bool {
        let mut until = self.active_until.lock();
        match *until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                *until = None;
                warn!("[chaos] TTL expired, fault injection disabled");
                false
            }
            None => false,
        }
    }

    /// Injection point. No-op unless a drill is active.
    pub async fn inject(&self, context: &str, correlation_id: &str) -> Result<(), InjectedFault> {
        if !self.is_active() {
            return Ok(());
        }

        let (fail, stall) = {
            let mut rng = rand::thread_rng();
            let fail = rng.gen_bool(FAULT_PROBABILITY);
            let stall = if rng.gen_bool(LATENCY_PROBABILITY) {
                Some(rng.gen_range(MIN_LATENCY_MS..=MAX_LATENCY_MS))
            } else {
                None
            };
            (fail, stall)
        };

        if fail {
            error!(context, correlation_id, "[chaos] Injecting fault");
            return Err(InjectedFault {
                context: context.to_string(),
                correlation_id: correlation_id.to_string(),
            });
        }

        if let Some(ms) = stall {
            warn!(context, correlation_id, delay_ms = ms, "[chaos] Injecting latency");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        Ok(())
    }
}
