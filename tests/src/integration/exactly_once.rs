//! # Exactly-Once Effects
//!
//! Redelivered and concurrent jobs must apply each rating change and each
//! prize payout once.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cx_03_ranking::RankingApi;
    use shared_bus::{
        RANKING_QUEUE, RANK_UPDATE_JOB, TOURNAMENT_ADVANCEMENT_JOB, TOURNAMENT_QUEUE,
    };
    use shared_types::{TournamentStatus, TransactionKind};

    use crate::integration::harness::Harness;

    fn ranking_fences(h: &Harness) -> usize {
        h.platform
            .store
            .read(|c| c.fences().filter(|f| f.scope == "ranking").count())
            .unwrap()
    }

    // =========================================================================
    // DUPLICATE RANKING JOBS
    // =========================================================================

    /// 1000 concurrent runs of the same job: one K=32 update, two ledger rows.
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_thousand_concurrent_duplicate_ranking_jobs() {
        let h = Harness::new();
        let winner = h.player(0).await;
        let loser = h.player(0).await;
        let match_id = h.completed_duel(winner, loser);

        let mut tasks = Vec::with_capacity(1000);
        for _ in 0..1000 {
            let ranking: Arc<dyn RankingApi> = Arc::clone(&h.platform.ranking);
            tasks.push(tokio::spawn(
                async move { ranking.process_match(match_id).await },
            ));
        }

        let mut applied = 0;
        for task in tasks {
            let outcome = task.await.unwrap().unwrap();
            applied += outcome.applied.len();
        }

        assert_eq!(applied, 2);
        assert_eq!(ranking_fences(&h), 2);
        assert_eq!(h.rating(winner), 1016);
        assert_eq!(h.rating(loser), 984);
    }

    /// The same payload redelivered through the queue is skipped by the ledger.
    #[tokio::test]
    async fn test_redelivered_ranking_jobs_skip() {
        let h = Harness::new();
        let winner = h.player(0).await;
        let loser = h.player(0).await;
        let match_id = h.completed_duel(winner, loser);

        for _ in 0..25 {
            h.redeliver(RANKING_QUEUE, RANK_UPDATE_JOB, match_id).await;
        }
        assert_eq!(h.drain().await, 25);

        assert_eq!(h.rating(winner), 1016);
        assert_eq!(h.rating(loser), 984);
        let counts = h.platform.broker.counts_now(RANKING_QUEUE).unwrap();
        assert_eq!(counts.completed, 25);
        assert_eq!(counts.failed, 0);
        assert_eq!(
            h.platform
                .metrics
                .ledger_skips
                .with_label_values(&[RANK_UPDATE_JOB])
                .get(),
            24
        );
    }

    // =========================================================================
    // REPLAYED TOURNAMENT COMPLETION
    // =========================================================================

    /// Replaying the final's completion pays the champion exactly once.
    #[tokio::test]
    async fn test_replayed_final_pays_once() {
        let h = Harness::new();
        let (t, players) = h.seeded_tournament(2, 100).await;
        let final_match = h.round(t, 1)[0].id;

        h.confirm_round(t, 1).await;
        h.drain().await;
        for _ in 0..10 {
            h.redeliver(TOURNAMENT_QUEUE, TOURNAMENT_ADVANCEMENT_JOB, final_match)
                .await;
            h.redeliver(RANKING_QUEUE, RANK_UPDATE_JOB, final_match).await;
        }
        h.drain().await;

        let champion = players[0];
        assert_eq!(
            h.platform.store.tournament(&t).unwrap().status,
            TournamentStatus::Completed
        );
        assert_eq!(h.completed_count(TransactionKind::PrizePayout), 1);
        // 1000 funded, 100 fee, 200 pool.
        assert_eq!(h.platform.store.competitor(&champion).unwrap().wallet_balance, 1_100);
        assert_eq!(h.rating(champion), 1016);
        assert_eq!(h.platform.metrics.prize_payouts.get(), 1);
        assert!(h.supply_balanced());
    }
}
