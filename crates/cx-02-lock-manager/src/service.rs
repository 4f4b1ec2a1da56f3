//! Lock Manager service

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{quorum, validity, LockToken};
use crate::error::{LockError, LockResult};
use crate::ports::inbound::DistributedLockApi;
use crate::ports::outbound::LockBackend;

/// Redlock tuning.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Proportional clock drift allowance.
    pub drift_factor: f64,
    /// Extra attempts after the first.
    pub retry_count: u32,
    pub retry_delay: Duration,
    /// Upper bound of the random delay added to `retry_delay`.
    pub retry_jitter: Duration,
    /// Extend the lease once less than this remains.
    pub automatic_extension_threshold: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            drift_factor: 0.01,
            retry_count: 10,
            retry_delay: Duration::from_millis(200),
            retry_jitter: Duration::from_millis(200),
            automatic_extension_threshold: Duration::from_millis(500),
        }
    }
}

struct Shared {
    nodes: Vec<Arc<dyn LockBackend>>,
    config: LockConfig,
}

impl Shared {
    async fn lock_on_node(
        &self,
        node: &Arc<dyn LockBackend>,
        resources: &[String],
        token: LockToken,
        ttl: Duration,
    ) -> bool {
        for resource in resources {
            match node.try_acquire(resource, token, ttl).await {
                Ok(true) => {}
                Ok(false) => {
                    self.release_on_node(node, resources, token).await;
                    return false;
                }
                Err(e) => {
                    debug!(node = node.id(), error = %e, "[cx-02] Lock node unavailable");
                    self.release_on_node(node, resources, token).await;
                    return false;
                }
            }
        }
        true
    }

    async fn release_on_node(
        &self,
        node: &Arc<dyn LockBackend>,
        resources: &[String],
        token: LockToken,
    ) {
        for resource in resources {
            if let Err(e) = node.release(resource, token).await {
                debug!(node = node.id(), resource, error = %e, "[cx-02] Release failed");
            }
        }
    }

    async fn release_everywhere(&self, resources: &[String], token: LockToken) {
        for node in &self.nodes {
            self.release_on_node(node, resources, token).await;
        }
    }

    async fn extend_everywhere(&self, resources: &[String], token: LockToken, ttl: Duration) -> usize {
        let mut extended = 0;
        'nodes: for node in &self.nodes {
            for resource in resources {
                match node.extend(resource, token, ttl).await {
                    Ok(true) => {}
                    _ => continue 'nodes,
                }
            }
            extended += 1;
        }
        extended
    }

    fn retry_pause(&self) -> Duration {
        let jitter_ms = self.config.retry_jitter.as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
        self.config.retry_delay + Duration::from_millis(jitter)
    }
}

/// Quorum lock manager over independent nodes.
pub struct LockManager {
    shared: Arc<Shared>,
}

impl LockManager {
    pub fn new(nodes: Vec<Arc<dyn LockBackend>>, config: LockConfig) -> Self {
        Self {
            shared: Arc::new(Shared { nodes, config }),
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.shared.config
    }

    pub fn node_count(&self) -> usize {
        self.shared.nodes.len()
    }
}

#[async_trait]
impl DistributedLockApi for LockManager {
    async fn acquire(&self, resources: &[String], ttl: Duration) -> LockResult<LockGuard> {
        let shared = &self.shared;
        if shared.nodes.is_empty() {
            return Err(LockError::InvalidRequest("no lock nodes configured".into()));
        }
        if resources.is_empty() {
            return Err(LockError::InvalidRequest("no resources requested".into()));
        }

        let needed = quorum(shared.nodes.len());
        let attempts = shared.config.retry_count + 1;

        for attempt in 1..=attempts {
            let token = LockToken::new();
            let start = Instant::now();

            let mut locked = 0;
            for node in &shared.nodes {
                if shared.lock_on_node(node, resources, token, ttl).await {
                    locked += 1;
                }
            }

            if locked >= needed {
                if let Some(valid) = validity(ttl, start.elapsed(), shared.config.drift_factor) {
                    debug!(
                        resources = ?resources,
                        token = %token,
                        attempt,
                        nodes = locked,
                        "[cx-02] Lock acquired"
                    );
                    return Ok(LockGuard::start(
                        Arc::clone(shared),
                        resources.to_vec(),
                        token,
                        ttl,
                        start + valid,
                    ));
                }
            }

            shared.release_everywhere(resources, token).await;
            if attempt < attempts {
                tokio::time::sleep(shared.retry_pause()).await;
            }
        }

        debug!(resources = ?resources, attempts, "[cx-02] Lock contention, giving up");
        Err(LockError::Contention {
            resources: resources.join(","),
            attempts,
        })
    }
}

/// A held lock. Auto-extends until released.
///
/// Call [`LockGuard::release`] on every path. Dropping the guard without it
/// spawns a best-effort release on the current runtime.
pub struct LockGuard {
    shared: Arc<Shared>,
    resources: Vec<String>,
    token: LockToken,
    expires_at: Arc<Mutex<Instant>>,
    lost: Arc<AtomicBool>,
    extender: Option<JoinHandle<()>>,
    released: bool,
}

impl LockGuard {
    fn start(
        shared: Arc<Shared>,
        resources: Vec<String>,
        token: LockToken,
        ttl: Duration,
        expires_at: Instant,
    ) -> Self {
        let expires_at = Arc::new(Mutex::new(expires_at));
        let lost = Arc::new(AtomicBool::new(false));
        let extender = tokio::spawn(extend_loop(
            Arc::clone(&shared),
            resources.clone(),
            token,
            ttl,
            Arc::clone(&expires_at),
            Arc::clone(&lost),
        ));
        Self {
            shared,
            resources,
            token,
            expires_at,
            lost,
            extender: Some(extender),
            released: false,
        }
    }

    pub fn token(&self) -> LockToken {
        self.token
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Whether the lease could not be kept alive.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst) || Instant::now() >= *self.expires_at.lock()
    }

    /// Stop extending and delete the lease on every node.
    pub async fn release(mut self) {
        if let Some(extender) = self.extender.take() {
            extender.abort();
        }
        self.shared
            .release_everywhere(&self.resources, self.token)
            .await;
        self.released = true;
        debug!(resources = ?self.resources, token = %self.token, "[cx-02] Lock released");
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("resources", &self.resources)
            .field("token", &self.token)
            .field("lost", &self.lost.load(Ordering::SeqCst))
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(extender) = self.extender.take() {
            extender.abort();
        }
        if self.released {
            return;
        }
        warn!(resources = ?self.resources, "[cx-02] Lock guard dropped without release");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let shared = Arc::clone(&self.shared);
            let resources = std::mem::take(&mut self.resources);
            let token = self.token;
            handle.spawn(async move {
                shared.release_everywhere(&resources, token).await;
            });
        }
    }
}

async fn extend_loop(
    shared: Arc<Shared>,
    resources: Vec<String>,
    token: LockToken,
    ttl: Duration,
    expires_at: Arc<Mutex<Instant>>,
    lost: Arc<AtomicBool>,
) {
    let lead = shared.config.automatic_extension_threshold.min(ttl / 2);
    let needed = quorum(shared.nodes.len());

    loop {
        let expires = *expires_at.lock();
        let wake = expires.checked_sub(lead).unwrap_or(expires);
        tokio::time::sleep_until(wake).await;

        let start = Instant::now();
        let extended = shared.extend_everywhere(&resources, token, ttl).await;
        match validity(ttl, start.elapsed(), shared.config.drift_factor) {
            Some(valid) if extended >= needed => {
                *expires_at.lock() = start + valid;
            }
            _ => {
                lost.store(true, Ordering::SeqCst);
                info!(
                    resources = ?resources,
                    extended,
                    needed,
                    "[cx-02] Lease extension failed, lock lost"
                );
                return;
            }
        }
    }
}
