//! # Event Subscriber
//!
//! Receiving side of the notification bus.

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::PlatformEvent;

/// A subscription handle. Dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<PlatformEvent>,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<PlatformEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<PlatformEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "[bus] Subscriber lagged, events dropped");
                }
            }
        }
    }

    /// Next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<PlatformEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
