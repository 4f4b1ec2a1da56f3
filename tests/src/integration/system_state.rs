//! # System State
//!
//! Queue-driven hysteresis and forced escalation seen through the operator
//! console, the write gate and escrow.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cx_04_escrow::EscrowApi;
    use cx_07_system_state::{GateRequest, SystemStateApi};
    use shared_bus::{JobQueue, MatchJobPayload, RANKING_QUEUE, RANK_UPDATE_JOB, TOURNAMENT_QUEUE};
    use shared_types::{
        MatchId, Role, SystemStateKind, TournamentStatus, TransactionKind, TransactionStatus,
    };

    use crate::integration::harness::Harness;

    async fn flood(h: &Harness, jobs: usize) {
        for _ in 0..jobs {
            let payload = serde_json::to_value(MatchJobPayload {
                match_id: MatchId::new(),
            })
            .unwrap();
            h.platform
                .broker
                .enqueue(RANKING_QUEUE, RANK_UPDATE_JOB, payload)
                .await
                .unwrap();
        }
    }

    fn settle(h: &Harness, jobs: usize) {
        for _ in 0..jobs {
            let job = h.platform.broker.reserve(RANKING_QUEUE).unwrap();
            h.platform.broker.complete(RANKING_QUEUE, &job.id);
        }
    }

    // =========================================================================
    // HYSTERESIS
    // =========================================================================

    #[tokio::test]
    async fn test_queue_depth_hysteresis() {
        let h = Harness::new();
        let admin = h.platform.admin_console();
        let join = GateRequest::write("/api/tournaments/join", Some(Role::Player));

        flood(&h, 500).await;
        let state = admin.force_evaluation().await.unwrap();
        assert_eq!(state.state, SystemStateKind::Degraded);

        let rejection = h.platform.gate.check(&join).await.unwrap_err();
        assert_eq!(rejection.code, "SYSTEM_DEGRADED");
        assert!(h.platform.gate.check(&GateRequest::read("/api/matches")).await.is_ok());

        // Between the return and enter thresholds nothing changes.
        settle(&h, 100);
        assert_eq!(h.platform.broker.counts_now(RANKING_QUEUE).unwrap().depth(), 400);
        let state = admin.force_evaluation().await.unwrap();
        assert_eq!(state.state, SystemStateKind::Degraded);

        settle(&h, 100);
        let state = admin.force_evaluation().await.unwrap();
        assert_eq!(state.state, SystemStateKind::Normal);
        assert!(h.platform.gate.check(&join).await.is_ok());

        let history = admin.state_history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].next, SystemStateKind::Normal);
        assert_eq!(history[1].next, SystemStateKind::Degraded);
    }

    // =========================================================================
    // FORCED ESCALATION
    // =========================================================================

    #[tokio::test]
    async fn test_forced_critical_freezes_payouts() {
        let h = Harness::new();
        let winner = h.player(0).await;
        let t = h.tournament(0, 500);

        let state = h
            .platform
            .controller
            .force_critical("Ledger mismatch", "reconciliation", vec!["drill".to_string()])
            .await
            .unwrap();
        assert_eq!(state.state, SystemStateKind::Critical);

        let history = h.platform.controller.transitions(5).await.unwrap();
        assert_eq!(history[0].previous, SystemStateKind::Normal);
        assert_eq!(history[0].next, SystemStateKind::Critical);

        let err = h
            .platform
            .escrow
            .credit_prize_payout(t, winner)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SYSTEM_CRITICAL");
        assert_eq!(h.platform.escrow.balance(winner).await.unwrap(), 0);

        let rejection = h
            .platform
            .gate
            .check(&GateRequest::write("/api/tournaments", Some(Role::Player)))
            .await
            .unwrap_err();
        assert_eq!(rejection.code, "SYSTEM_CRITICAL");

        // Held until released, then an idle platform steps down.
        let admin = h.platform.admin_console();
        assert_eq!(admin.force_evaluation().await.unwrap().state, SystemStateKind::Critical);
        admin.release_escalation("drill over").await.unwrap();
        assert_ne!(admin.force_evaluation().await.unwrap().state, SystemStateKind::Critical);
    }

    fn failed_payouts(h: &Harness) -> usize {
        h.platform
            .store
            .read(|c| {
                c.transactions()
                    .iter()
                    .filter(|t| {
                        t.kind == TransactionKind::PrizePayout
                            && t.status == TransactionStatus::Failed
                    })
                    .count()
            })
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_frozen_prize_waits_out_critical_on_the_queue() {
        let h = Harness::new();
        let (t, players) = h.seeded_tournament(2, 100).await;
        let champion = players[0];
        let wallet_before = h.platform.escrow.balance(champion).await.unwrap();

        h.confirm_round(t, 1).await;
        h.platform
            .controller
            .force_critical("Ledger mismatch", "reconciliation", vec!["drill".to_string()])
            .await
            .unwrap();
        h.drain().await;

        // Far longer than the tournament queue's retry budget would last.
        for _ in 0..10 {
            tokio::time::advance(Duration::from_secs(30)).await;
            h.drain().await;
        }

        assert_eq!(
            h.platform.store.tournament(&t).unwrap().status,
            TournamentStatus::Completed
        );
        assert_eq!(failed_payouts(&h), 1);
        assert_eq!(h.completed_count(TransactionKind::PrizePayout), 0);
        assert!(h.platform.broker.dead_letters(TOURNAMENT_QUEUE).is_empty());
        let counts = h.platform.broker.counts_now(TOURNAMENT_QUEUE).unwrap();
        assert_eq!(counts.delayed, 1);
        assert_eq!(counts.failed, 0);

        // One refused payout is not enough to keep the platform CRITICAL.
        let admin = h.platform.admin_console();
        admin.release_escalation("drill over").await.unwrap();
        assert_ne!(admin.force_evaluation().await.unwrap().state, SystemStateKind::Critical);

        tokio::time::advance(Duration::from_secs(30)).await;
        h.drain().await;

        assert_eq!(h.completed_count(TransactionKind::PrizePayout), 1);
        assert_eq!(failed_payouts(&h), 1);
        assert!(h.platform.broker.dead_letters(TOURNAMENT_QUEUE).is_empty());
        let prize = h
            .platform
            .store
            .read(|c| {
                c.transactions()
                    .iter()
                    .find(|t| t.kind == TransactionKind::PrizePayout && t.is_completed())
                    .map(|t| (t.user, t.amount))
            })
            .unwrap()
            .unwrap();
        assert_eq!(prize.0, champion);
        assert!(prize.1 > 0);
        assert_eq!(
            h.platform.escrow.balance(champion).await.unwrap(),
            wallet_before + prize.1
        );
        assert!(h.supply_balanced());
    }
}
