//! In-memory lock node

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::domain::LockToken;
use crate::error::{LockError, LockResult};
use crate::ports::outbound::LockBackend;

/// Lock node keeping leases in a map. Expired leases count as free.
pub struct InMemoryLockNode {
    id: String,
    leases: Mutex<HashMap<String, (LockToken, Instant)>>,
    offline: AtomicBool,
}

impl InMemoryLockNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            leases: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate a node outage.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Current live owner of `resource`.
    pub fn holder(&self, resource: &str) -> Option<LockToken> {
        let now = Instant::now();
        self.leases
            .lock()
            .get(resource)
            .filter(|(_, expires)| *expires > now)
            .map(|(token, _)| *token)
    }

    fn check_online(&self) -> LockResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LockError::Backend {
                node: self.id.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LockBackend for InMemoryLockNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn try_acquire(
        &self,
        resource: &str,
        token: LockToken,
        ttl: Duration,
    ) -> LockResult<bool> {
        self.check_online()?;
        let now = Instant::now();
        let mut leases = self.leases.lock();
        match leases.get(resource) {
            Some((_, expires)) if *expires > now => Ok(false),
            _ => {
                leases.insert(resource.to_string(), (token, now + ttl));
                Ok(true)
            }
        }
    }

    async fn extend(&self, resource: &str, token: LockToken, ttl: Duration) -> LockResult<bool> {
        self.check_online()?;
        let now = Instant::now();
        let mut leases = self.leases.lock();
        match leases.get_mut(resource) {
            Some((owner, expires)) if *owner == token && *expires > now => {
                *expires = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, resource: &str, token: LockToken) -> LockResult<()> {
        self.check_online()?;
        let mut leases = self.leases.lock();
        if leases.get(resource).is_some_and(|(owner, _)| *owner == token) {
            leases.remove(resource);
        }
        Ok(())
    }
}
