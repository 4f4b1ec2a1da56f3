//! # Platform Container
//!
//! Builds every subsystem over shared infrastructure, in dependency order:
//!
//! ```text
//! Level 0: document store, key-value store, job broker, event bus, clock, chaos switch
//! Level 1: idempotency ledger, lock manager, prediction client
//! Level 2: system-state controller (queue load + risk signals)
//! Level 3: escrow (reads system state), ranking, integrity
//! Level 4: bracket (locks + escrow payouts), reconciliation (escalates to controller)
//! Level 5: match intake, queue workers, scheduler, admin console
//! ```
//!
//! Every service is held behind `Arc` and shared by the workers.

use std::sync::Arc;

use cortex_telemetry::CortexMetrics;
use cx_01_idempotency_ledger::IdempotencyLedger;
use cx_02_lock_manager::{InMemoryLockNode, LockBackend, LockManager};
use cx_03_ranking::{RankingApi, RankingService};
use cx_04_escrow::{EscrowApi, EscrowService};
use cx_05_bracket::{BracketApi, BracketService, EscrowDisbursement};
use cx_06_integrity::{IntegrityApi, IntegrityService};
use cx_07_system_state::{JobQueueMetrics, StoreRiskSignals, SystemStateController, WriteGate};
use cx_08_reconciliation::{ControllerEscalation, ReconciliationApi, ReconciliationService};
use prometheus::Registry;
use shared_bus::{
    InMemoryEventBus, InMemoryJobQueue, JobHandler, Worker, WorkerConfig, INTEGRITY_QUEUE,
    RANKING_QUEUE, SEASON_QUEUE, SYSTEM_QUEUE, TOURNAMENT_QUEUE,
};
use shared_store::{DocumentStore, InMemoryKeyValueStore};
use shared_types::{Clock, FaultInjector, SystemClock};
use tracing::{info, instrument, warn};

use crate::adapters::{HttpPredictor, LoggingNotifier, MeteredEscrow};
use crate::admin::AdminConsole;
use crate::config::PlatformConfig;
use crate::error::RuntimeResult;
use crate::handlers::{
    IntegrityJobHandler, Metered, RankingJobHandler, SeasonJobHandler, SystemJobHandler,
    TournamentJobHandler,
};
use crate::intake::MatchResultIntake;
use crate::scheduler::Scheduler;

/// All subsystem instances of one worker process.
pub struct Platform {
    pub config: PlatformConfig,
    pub clock: Arc<dyn Clock>,
    pub registry: Registry,
    pub metrics: Arc<CortexMetrics>,

    // Level 0
    pub store: Arc<DocumentStore>,
    pub kv: Arc<InMemoryKeyValueStore>,
    pub broker: Arc<InMemoryJobQueue>,
    pub events: Arc<InMemoryEventBus>,
    pub faults: Arc<FaultInjector>,

    // Level 1
    pub ledger: Arc<IdempotencyLedger>,
    pub locks: Arc<LockManager>,

    // Level 2
    pub controller: Arc<SystemStateController>,
    pub gate: Arc<WriteGate>,

    // Level 3
    pub escrow: Arc<dyn EscrowApi>,
    pub ranking: Arc<dyn RankingApi>,
    pub integrity: Arc<dyn IntegrityApi>,

    // Level 4
    pub bracket: Arc<dyn BracketApi>,
    pub reconciliation: Arc<dyn ReconciliationApi>,

    // Level 5
    pub intake: Arc<MatchResultIntake>,
}

impl Platform {
    /// Wire every subsystem. Metrics are registered on `registry`.
    #[instrument(name = "platform_init", skip_all, fields(worker = %config.worker_id))]
    pub fn build(
        config: PlatformConfig,
        clock: Arc<dyn Clock>,
        registry: Registry,
    ) -> RuntimeResult<Self> {
        config.validate()?;
        let metrics = Arc::new(CortexMetrics::register(&registry)?);

        // Level 0
        let store = Arc::new(DocumentStore::new());
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let broker = Arc::new(InMemoryJobQueue::new());
        for tuning in &config.queues {
            broker.declare(tuning.name, tuning.options);
        }
        let events = Arc::new(InMemoryEventBus::new());
        let notifier = Arc::new(LoggingNotifier::new(Arc::clone(&events), Arc::clone(&metrics)));
        let faults = Arc::new(FaultInjector::new());
        info!(queues = config.queues.len(), "[runtime] Level 0 infrastructure ready");

        // Level 1
        let ledger = Arc::new(IdempotencyLedger::new(Arc::clone(&store)));
        let nodes: Vec<Arc<dyn LockBackend>> = (0..config.lock_nodes)
            .map(|i| {
                Arc::new(InMemoryLockNode::new(format!("{}-lock-{i}", config.worker_id)))
                    as Arc<dyn LockBackend>
            })
            .collect();
        let locks = Arc::new(LockManager::new(nodes, config.locks.clone()));
        let predictor = Arc::new(HttpPredictor::new(&config.prediction)?);
        if !predictor.is_configured() {
            warn!("[runtime] No prediction service configured, Elo expectation only");
        }
        info!(lock_nodes = config.lock_nodes, "[runtime] Level 1 ready");

        // Level 2
        let controller = Arc::new(SystemStateController::new(
            kv.clone(),
            Arc::clone(&store),
            Arc::new(JobQueueMetrics::new(broker.clone())),
            Arc::new(StoreRiskSignals::new(
                Arc::clone(&store),
                config.system_state.suspicion_threshold,
            )),
            notifier.clone(),
            Arc::clone(&clock),
            config.system_state.clone(),
        ));
        let gate = Arc::new(WriteGate::new(controller.clone()));

        // Level 3
        let escrow: Arc<dyn EscrowApi> = Arc::new(MeteredEscrow::new(
            Arc::new(EscrowService::new(
                Arc::clone(&store),
                controller.clone(),
                Arc::clone(&faults),
                Arc::clone(&clock),
                config.escrow.clone(),
            )),
            Arc::clone(&metrics),
        ));
        let ranking: Arc<dyn RankingApi> = Arc::new(RankingService::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&predictor),
            Arc::clone(&faults),
            Arc::clone(&clock),
            config.ranking.clone(),
        ));
        let integrity: Arc<dyn IntegrityApi> = Arc::new(IntegrityService::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            predictor,
            Arc::clone(&clock),
            config.integrity.clone(),
        ));

        // Level 4
        let bracket: Arc<dyn BracketApi> = Arc::new(BracketService::new(
            Arc::clone(&store),
            locks.clone(),
            Arc::new(EscrowDisbursement::new(Arc::clone(&escrow))),
            notifier,
            Arc::clone(&faults),
            Arc::clone(&clock),
            config.bracket.clone(),
        ));
        let reconciliation: Arc<dyn ReconciliationApi> = Arc::new(ReconciliationService::new(
            Arc::clone(&store),
            controller.clone(),
            Arc::new(ControllerEscalation::new(controller.clone())),
            Arc::clone(&clock),
            config.reconciliation.clone(),
        ));

        // Level 5
        let intake = Arc::new(MatchResultIntake::new(
            Arc::clone(&store),
            broker.clone(),
            Arc::clone(&clock),
        ));
        info!("[runtime] All subsystems wired");

        Ok(Self {
            config,
            clock,
            registry,
            metrics,
            store,
            kv,
            broker,
            events,
            faults,
            ledger,
            locks,
            controller,
            gate,
            escrow,
            ranking,
            integrity,
            bracket,
            reconciliation,
            intake,
        })
    }

    /// Platform on the wall clock with a private metrics registry.
    pub fn in_memory(config: PlatformConfig) -> RuntimeResult<Self> {
        Self::build(config, Arc::new(SystemClock), Registry::new())
    }

    /// One consumer per declared queue, each handler wrapped in [`Metered`].
    pub fn workers(&self) -> Vec<Arc<Worker>> {
        self.config
            .queues
            .iter()
            .filter_map(|tuning| {
                let handler = self.handler_for(tuning.name)?;
                let metered = Arc::new(Metered::new(
                    tuning.name,
                    tuning.options,
                    handler,
                    Arc::clone(&self.metrics),
                ));
                Some(Arc::new(Worker::new(
                    tuning.name,
                    Arc::clone(&self.broker),
                    metered,
                    WorkerConfig {
                        concurrency: tuning.concurrency,
                        poll_interval: self.config.poll_interval,
                    },
                )))
            })
            .collect()
    }

    fn handler_for(&self, queue: &str) -> Option<Arc<dyn JobHandler>> {
        let metrics = Arc::clone(&self.metrics);
        let handler: Arc<dyn JobHandler> = match queue {
            RANKING_QUEUE => Arc::new(RankingJobHandler::new(Arc::clone(&self.ranking), metrics)),
            INTEGRITY_QUEUE => Arc::new(IntegrityJobHandler::new(
                Arc::clone(&self.integrity),
                metrics,
            )),
            TOURNAMENT_QUEUE => Arc::new(TournamentJobHandler::new(
                Arc::clone(&self.bracket),
                metrics,
            )),
            SYSTEM_QUEUE => Arc::new(SystemJobHandler::new(
                self.controller.clone(),
                Arc::clone(&self.reconciliation),
                metrics,
            )),
            SEASON_QUEUE => Arc::new(SeasonJobHandler::new(Arc::clone(&self.integrity))),
            other => {
                warn!(queue = other, "[runtime] No handler for queue, not consuming");
                return None;
            }
        };
        Some(handler)
    }

    pub fn scheduler(&self) -> Arc<Scheduler> {
        Arc::new(Scheduler::new(
            self.broker.clone(),
            self.locks.clone(),
            self.kv.clone(),
            Arc::clone(&self.clock),
            self.config.schedule.clone(),
            Arc::clone(&self.metrics),
        ))
    }

    pub fn admin_console(&self) -> AdminConsole {
        AdminConsole::new(
            Arc::clone(&self.controller),
            Arc::clone(&self.reconciliation),
            Arc::clone(&self.broker),
            Arc::clone(&self.faults),
            self.registry.clone(),
            self.config.chaos_ttl,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueTuning;

    #[tokio::test]
    async fn test_one_worker_per_platform_queue() {
        let platform = Platform::in_memory(PlatformConfig::default()).unwrap();
        let mut queues: Vec<String> = platform
            .workers()
            .iter()
            .map(|w| w.queue_name().to_string())
            .collect();
        queues.sort();
        assert_eq!(queues, platform.broker.queue_names());
        assert_eq!(queues.len(), 5);
    }

    #[tokio::test]
    async fn test_unknown_queue_gets_no_worker() {
        let mut config = PlatformConfig::default();
        config.queues.push(QueueTuning {
            name: "exports",
            options: Default::default(),
            concurrency: 1,
        });
        let platform = Platform::in_memory(config).unwrap();
        assert_eq!(platform.workers().len(), 5);
        assert_eq!(platform.broker.queue_names().len(), 6);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PlatformConfig::default();
        config.lock_nodes = 0;
        assert!(Platform::in_memory(config).is_err());
    }
}
