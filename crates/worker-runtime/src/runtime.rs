//! Process lifecycle: start consumers and the scheduler, stop them on signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::Platform;

/// How long shutdown waits for in-flight jobs.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// The running worker process.
pub struct WorkerRuntime {
    platform: Arc<Platform>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerRuntime {
    pub fn new(platform: Platform) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            platform: Arc::new(platform),
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        }
    }

    pub fn platform(&self) -> Arc<Platform> {
        Arc::clone(&self.platform)
    }

    /// Spawn one consumer per queue and the scheduler.
    pub fn start(&mut self) {
        info!("===========================================");
        info!("  Cortex Worker v{}", env!("CARGO_PKG_VERSION"));
        info!("  Worker: {}", self.platform.config.worker_id);
        info!("===========================================");

        for worker in self.platform.workers() {
            let shutdown = self.shutdown_rx.clone();
            self.tasks.push(tokio::spawn(worker.run(shutdown)));
        }

        let scheduler = self.platform.scheduler();
        for job in scheduler.jobs() {
            info!(job = job.job, queue = job.queue, every_secs = job.every.as_secs(), "[runtime] Scheduled");
        }
        self.tasks
            .push(tokio::spawn(scheduler.run(self.shutdown_rx.clone())));

        info!(tasks = self.tasks.len(), "[runtime] Worker running");
    }

    /// Signal every task to stop and wait for in-flight jobs to drain.
    pub async fn shutdown(&mut self) {
        info!("[runtime] Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!(error = %e, "[runtime] Failed to send shutdown signal");
        }

        let tasks = std::mem::take(&mut self.tasks);
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            for task in tasks {
                if let Err(e) = task.await {
                    error!(error = %e, "[runtime] Task ended abnormally");
                }
            }
        })
        .await;

        match drained {
            Ok(()) => info!("[runtime] Shutdown complete"),
            Err(_) => warn!(
                grace_secs = SHUTDOWN_GRACE.as_secs(),
                "[runtime] Shutdown grace elapsed with jobs in flight"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformConfig;
    use crate::intake::ResultSubmission;
    use shared_bus::RANKING_QUEUE;
    use shared_store::StoreError;
    use shared_types::{Competitor, Game, Match, ScoringType, Tournament};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_confirmed_match_is_ranked_by_running_workers() {
        let mut config = PlatformConfig::default();
        config.poll_interval = Duration::from_millis(10);
        let mut runtime = WorkerRuntime::new(Platform::in_memory(config).unwrap());
        let platform = runtime.platform();

        let a = Competitor::new("a");
        let b = Competitor::new("b");
        let (ua, ub) = (a.id, b.id);
        let game = Game::new("arena", ScoringType::WinLoss);
        let game_id = game.id;
        let cup = Tournament::new("cup", game.id, chrono::Utc::now());
        let m = Match::scheduled(Some(cup.id), 1, 0, vec![ua, ub], chrono::Utc::now());
        let match_id = m.id;
        platform
            .store
            .transaction(|c| {
                c.put_competitor(a);
                c.put_competitor(b);
                c.put_game(game);
                c.put_tournament(cup);
                c.put_match(m);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        runtime.start();
        platform
            .intake
            .confirm_match_result(match_id, &ResultSubmission::winner(ua))
            .await
            .unwrap();

        let rating = |user| {
            platform
                .store
                .competitor(&user)
                .unwrap()
                .game_record(&game_id)
                .rating_points
        };
        let mut ranked = false;
        for _ in 0..300 {
            if platform.broker.counts_now(RANKING_QUEUE).unwrap().completed == 1 {
                ranked = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        runtime.shutdown().await;

        assert!(ranked);
        assert_eq!(rating(ua), 1016);
        assert_eq!(rating(ub), 984);
    }
}
