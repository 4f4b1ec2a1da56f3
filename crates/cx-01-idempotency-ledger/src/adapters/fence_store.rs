//! Fence index adapters

use std::collections::BTreeSet;

use shared_store::{Collections, Fence, StoreError, StoreResult};

use crate::ports::outbound::FenceWriter;

impl FenceWriter for Collections {
    fn insert_fence(&mut self, fence: Fence) -> StoreResult<()> {
        Collections::insert_fence(self, fence)
    }

    fn has_fence(&self, fence: &Fence) -> bool {
        Collections::has_fence(self, fence)
    }
}

/// In-memory fence index for tests. Can be told to fail like a broken store.
#[derive(Debug, Default)]
pub struct MockFenceWriter {
    pub fences: BTreeSet<Fence>,
    pub fail_with: Option<StoreError>,
}

impl MockFenceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: StoreError) -> Self {
        Self {
            fences: BTreeSet::new(),
            fail_with: Some(error),
        }
    }
}

impl FenceWriter for MockFenceWriter {
    fn insert_fence(&mut self, fence: Fence) -> StoreResult<()> {
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        if !self.fences.insert(fence) {
            return Err(StoreError::UniqueViolation {
                index: "ledger_fence",
            });
        }
        Ok(())
    }

    fn has_fence(&self, fence: &Fence) -> bool {
        self.fences.contains(fence)
    }
}
