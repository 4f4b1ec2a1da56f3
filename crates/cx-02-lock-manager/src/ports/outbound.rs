//! Driven Ports (SPI - Outbound)

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::LockToken;
use crate::error::LockResult;

/// One independent lock node (a Redis-like server in production).
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Node name for logs.
    fn id(&self) -> &str;

    /// Set `resource` to `token` if free or expired. Returns whether it was set.
    async fn try_acquire(&self, resource: &str, token: LockToken, ttl: Duration)
        -> LockResult<bool>;

    /// Push the expiry of `resource` if still owned by `token`.
    async fn extend(&self, resource: &str, token: LockToken, ttl: Duration) -> LockResult<bool>;

    /// Delete `resource` if still owned by `token`.
    async fn release(&self, resource: &str, token: LockToken) -> LockResult<()>;
}
