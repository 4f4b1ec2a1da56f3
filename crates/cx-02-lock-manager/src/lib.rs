//! # cx-02-lock-manager
//!
//! Mutual exclusion over named resources across worker processes.
//!
//! ## Algorithm
//!
//! Quorum leases over N independent lock nodes:
//!
//! ```text
//! for attempt in 0..=retry_count:
//!     token ← random
//!     lock every resource on every node (SET NX PX ttl)
//!     validity = ttl - elapsed - (ttl·drift_factor + 2ms)
//!     if nodes_locked ≥ N/2+1 and validity > 0 → LockGuard
//!     else release everywhere, sleep retry_delay + jitter
//! → LockError::Contention
//! ```
//!
//! While a [`LockGuard`] is held, a background task extends the lease once
//! less than `automatic_extension_threshold` remains. If the quorum cannot be
//! re-established the guard is marked lost. Leases of a crashed holder
//! expire on their own.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let guard = locks.acquire(&[format!("lock:tournament:{id}")], Duration::from_secs(5)).await?;
//! let result = critical_section().await;
//! guard.release().await;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::InMemoryLockNode;
pub use domain::{quorum, validity, LockToken};
pub use error::{LockError, LockResult};
pub use ports::inbound::DistributedLockApi;
pub use ports::outbound::LockBackend;
pub use service::{LockConfig, LockGuard, LockManager};
