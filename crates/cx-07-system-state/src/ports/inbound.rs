//! Driving Ports (API - Inbound)

use async_trait::async_trait;
use shared_types::{StateTransition, SystemState};

use crate::error::SystemStateResult;

/// Primary System State API.
#[async_trait]
pub trait SystemStateApi: Send + Sync {
    /// Current persisted state; `NORMAL` if nothing was persisted yet.
    async fn get_system_state(&self) -> SystemStateResult<SystemState>;

    /// Run one evaluation cycle and persist the result.
    async fn evaluate(&self) -> SystemStateResult<SystemState>;

    /// Unconditionally enter CRITICAL, bypassing the evaluation cycle.
    async fn force_critical(
        &self,
        reason: &str,
        source: &str,
        details: Vec<String>,
    ) -> SystemStateResult<SystemState>;

    /// Most recent transitions, newest first.
    async fn transitions(&self, limit: usize) -> SystemStateResult<Vec<StateTransition>>;
}
