//! Fast shared key-value store.
//!
//! Production: a Redis-like server shared by API and worker processes.
//! Testing: [`InMemoryKeyValueStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};

/// Abstract interface for the fast key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Put a single key-value pair.
    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    /// Delete a key.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// In-memory key-value store.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    data: RwLock<HashMap<String, String>>,
    offline: AtomicBool,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "key-value store offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_online()?;
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        self.check_online()?;
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_online()?;
        self.data.write().remove(key);
        Ok(())
    }
}
