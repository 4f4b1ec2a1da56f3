//! # Adapters Layer
//!
//! `FenceWriter` over the document store's transaction view, plus an
//! in-memory mock.

mod fence_store;

pub use fence_store::MockFenceWriter;
