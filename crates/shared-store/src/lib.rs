//! # Shared Store
//!
//! Storage engines consumed by the consistency core.
//!
//! - [`DocumentStore`]: transactional document store with multi-document
//!   transactions and unique indexes (idempotency fences, transaction keys,
//!   one prize payout per tournament).
//! - [`KeyValueStore`]: fast shared key-value store holding the system-state
//!   record read by every process.
//!
//! ## Transactions
//!
//! ```text
//! transaction(|txn| { read → check → write → insert })
//!        │
//!        ├── Ok  ──→ staged copy swapped in (all writes visible at once)
//!        └── Err ──→ staged copy dropped   (nothing persisted)
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod document;
pub mod error;
pub mod kv;

pub use document::{Collections, DocumentStore, Fence};
pub use error::{StoreError, StoreResult};
pub use kv::{InMemoryKeyValueStore, KeyValueStore};
