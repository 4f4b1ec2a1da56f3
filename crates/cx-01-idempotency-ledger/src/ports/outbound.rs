//! Driven Ports (SPI - Outbound)

use shared_store::{Fence, StoreResult};

/// Transactional view of the fence index.
pub trait FenceWriter {
    /// Insert a fence, failing with `StoreError::UniqueViolation` if present.
    fn insert_fence(&mut self, fence: Fence) -> StoreResult<()>;

    fn has_fence(&self, fence: &Fence) -> bool;
}
