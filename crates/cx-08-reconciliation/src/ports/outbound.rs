//! Driven Ports (SPI - Outbound)

use async_trait::async_trait;
use cx_07_system_state::SystemStateResult;

pub use shared_types::{Clock, SystemStateReader};

/// Out-of-band escalation into CRITICAL.
#[async_trait]
pub trait CriticalEscalation: Send + Sync {
    async fn escalate(
        &self,
        reason: &str,
        source: &str,
        details: Vec<String>,
    ) -> SystemStateResult<()>;
}
