//! Notification adapters. Production uses the shared event bus directly.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PlatformEvent};

/// Records every published event.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<PlatformEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlatformEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingNotifier {
    async fn publish(&self, event: PlatformEvent) -> usize {
        self.events.lock().push(event);
        1
    }

    fn events_published(&self) -> u64 {
        self.events.lock().len() as u64
    }
}
