//! Driven Ports (SPI - Outbound)
//!
//! The controller reads queue load from the work-queue broker and risk
//! counters from the document store. Both are traits so tests can pin them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{QueueLoad, RiskSignals};
use crate::error::SystemStateResult;

pub use shared_bus::EventPublisher;
pub use shared_store::KeyValueStore;
pub use shared_types::Clock;

/// Depth and dead-letter counts across the monitored queues.
#[async_trait]
pub trait QueueMetricsSource: Send + Sync {
    async fn queue_load(&self) -> QueueLoad;
}

/// Risk counters for records created at or after `since`.
#[async_trait]
pub trait RiskSignalSource: Send + Sync {
    async fn risk_signals(&self, since: DateTime<Utc>) -> SystemStateResult<RiskSignals>;
}
