//! Driving Ports (API - Inbound)

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LockResult;
use crate::service::LockGuard;

/// Primary lock API.
#[async_trait]
pub trait DistributedLockApi: Send + Sync {
    /// Acquire all `resources` for `ttl`, retrying within the configured budget.
    ///
    /// Fails with `LockError::Contention` when the budget is exhausted.
    async fn acquire(&self, resources: &[String], ttl: Duration) -> LockResult<LockGuard>;
}
