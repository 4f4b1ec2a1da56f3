//! Queue load from the work-queue broker.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{JobQueue, MONITORED_QUEUES};
use tracing::debug;

use crate::domain::QueueLoad;
use crate::ports::outbound::QueueMetricsSource;

/// Reads job counts of every monitored queue.
pub struct JobQueueMetrics {
    queue: Arc<dyn JobQueue>,
    queues: Vec<String>,
}

impl JobQueueMetrics {
    /// Watch the platform's match and season queues.
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self::with_queues(queue, MONITORED_QUEUES.iter().map(|q| q.to_string()).collect())
    }

    pub fn with_queues(queue: Arc<dyn JobQueue>, queues: Vec<String>) -> Self {
        Self { queue, queues }
    }
}

#[async_trait]
impl QueueMetricsSource for JobQueueMetrics {
    async fn queue_load(&self) -> QueueLoad {
        let mut load = QueueLoad::default();
        for name in &self.queues {
            // An unreachable queue contributes nothing this cycle.
            match self.queue.counts(name).await {
                Ok(counts) => {
                    load.max_depth = load.max_depth.max(counts.depth());
                    load.total_failed += counts.failed;
                }
                Err(e) => debug!(queue = %name, error = %e, "[cx-07] Queue counts unavailable"),
            }
        }
        load
    }
}

/// Fixed queue load, settable from tests and drills.
#[derive(Debug, Default)]
pub struct StaticQueueLoad {
    load: RwLock<QueueLoad>,
}

impl StaticQueueLoad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, load: QueueLoad) {
        *self.load.write() = load;
    }
}

#[async_trait]
impl QueueMetricsSource for StaticQueueLoad {
    async fn queue_load(&self) -> QueueLoad {
        *self.load.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{InMemoryJobQueue, RANKING_QUEUE, TOURNAMENT_QUEUE};

    #[tokio::test]
    async fn test_max_depth_and_failed_sum() {
        let broker = Arc::new(InMemoryJobQueue::with_platform_queues());
        for _ in 0..3 {
            broker
                .enqueue(RANKING_QUEUE, "rank-update", serde_json::json!({}))
                .await
                .unwrap();
        }
        broker
            .enqueue(TOURNAMENT_QUEUE, "tournament-advancement", serde_json::json!({}))
            .await
            .unwrap();

        let load = JobQueueMetrics::new(broker).queue_load().await;
        assert_eq!(load.max_depth, 3);
        assert_eq!(load.total_failed, 0);
    }

    #[tokio::test]
    async fn test_unknown_queue_is_skipped() {
        let broker = Arc::new(InMemoryJobQueue::with_platform_queues());
        let metrics = JobQueueMetrics::with_queues(broker, vec!["nope".to_string()]);
        assert_eq!(metrics.queue_load().await, QueueLoad::default());
    }
}
