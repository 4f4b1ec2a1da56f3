//! Notification adapter: logs and meters every platform event, then
//! forwards it to the in-process bus for any attached delivery layer.

use std::sync::Arc;

use async_trait::async_trait;
use cortex_telemetry::CortexMetrics;
use shared_bus::{EventPublisher, InMemoryEventBus, PlatformEvent};
use tracing::{info, warn};

pub struct LoggingNotifier {
    bus: Arc<InMemoryEventBus>,
    metrics: Arc<CortexMetrics>,
}

impl LoggingNotifier {
    pub fn new(bus: Arc<InMemoryEventBus>, metrics: Arc<CortexMetrics>) -> Self {
        Self { bus, metrics }
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }
}

#[async_trait]
impl EventPublisher for LoggingNotifier {
    async fn publish(&self, event: PlatformEvent) -> usize {
        match &event {
            PlatformEvent::SystemStateChanged {
                previous,
                next,
                reason,
            } => {
                self.metrics
                    .state_transitions
                    .with_label_values(&[next.as_str()])
                    .inc();
                self.metrics.system_state.set(next.level());
                warn!(%previous, %next, reason = %reason, "[notify] System state changed");
            }
            PlatformEvent::BracketAdvanced { tournament, round } => {
                info!(tournament_id = %tournament, round, "[notify] Bracket advanced");
            }
            PlatformEvent::TournamentCompleted { tournament, winner } => {
                info!(tournament_id = %tournament, winner = %winner, "[notify] Tournament completed");
            }
        }
        self.bus.publish(event).await
    }

    fn events_published(&self) -> u64 {
        self.bus.events_published()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;
    use shared_types::{SystemStateKind, TournamentId};

    #[tokio::test]
    async fn test_state_change_is_metered_and_forwarded() {
        let metrics = Arc::new(CortexMetrics::register(&Registry::new()).unwrap());
        let bus = Arc::new(InMemoryEventBus::new());
        let mut subscription = bus.subscribe();
        let notifier = LoggingNotifier::new(Arc::clone(&bus), Arc::clone(&metrics));

        notifier
            .publish(PlatformEvent::SystemStateChanged {
                previous: SystemStateKind::Normal,
                next: SystemStateKind::Critical,
                reason: "Critical markers detected".to_string(),
            })
            .await;
        notifier
            .publish(PlatformEvent::BracketAdvanced {
                tournament: TournamentId::new(),
                round: 2,
            })
            .await;

        assert_eq!(
            metrics
                .state_transitions
                .with_label_values(&["CRITICAL"])
                .get(),
            1
        );
        assert_eq!(metrics.system_state.get(), 2);
        assert_eq!(notifier.events_published(), 2);
        assert!(matches!(
            subscription.try_recv(),
            Some(PlatformEvent::SystemStateChanged { .. })
        ));
    }
}
