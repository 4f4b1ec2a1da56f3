//! # Worker Pipeline
//!
//! A tournament played against the background runtime: workers, scheduler
//! and audits all running.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cx_04_escrow::EscrowApi;
    use cx_05_bracket::BracketApi;
    use shared_bus::PlatformEvent;
    use shared_store::StoreError;
    use shared_types::{
        Competitor, Game, Match, ScoringType, Tournament, TournamentId, TournamentStatus,
        TransactionKind, UserId,
    };
    use worker_runtime::{Platform, PlatformConfig, ResultSubmission, WorkerRuntime};

    async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..3_000 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn round(platform: &Platform, t: TournamentId, round: u32) -> Vec<Match> {
        platform
            .store
            .read(|c| c.matches_in_round(&t, round).into_iter().cloned().collect())
            .unwrap()
    }

    fn payouts(platform: &Platform) -> Vec<(UserId, i64)> {
        platform
            .store
            .read(|c| {
                c.transactions()
                    .iter()
                    .filter(|t| t.kind == TransactionKind::PrizePayout && t.is_completed())
                    .map(|t| (t.user, t.amount))
                    .collect()
            })
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_four_player_tournament_end_to_end() {
        let mut config = PlatformConfig::default();
        config.poll_interval = Duration::from_millis(5);
        let mut runtime = WorkerRuntime::new(Platform::in_memory(config).unwrap());
        let platform: Arc<Platform> = runtime.platform();
        let mut events = platform.events.subscribe();

        let game = Game::new("arena", ScoringType::WinLoss);
        let cup = Tournament {
            entry_fee: 100,
            ..Tournament::new("Spring Cup", game.id, chrono::Utc::now())
        };
        let t = cup.id;
        let players: Vec<Competitor> = (0..4).map(|i| Competitor::new(format!("p{i}"))).collect();
        let ids: Vec<UserId> = players.iter().map(|p| p.id).collect();
        platform
            .store
            .transaction(|c| {
                c.put_game(game);
                c.put_tournament(cup);
                for p in players {
                    c.put_competitor(p);
                }
                Ok::<_, StoreError>(())
            })
            .unwrap();
        for id in &ids {
            platform
                .escrow
                .deposit(*id, 1_000, format!("seed_{id}"))
                .await
                .unwrap();
            platform.escrow.join_tournament(*id, t, None).await.unwrap();
        }
        platform.bracket.seed_bracket(t).await.unwrap();

        runtime.start();

        for r in 1..=2 {
            assert!(wait_for(|| !round(&platform, t, r).is_empty()).await, "round {r} missing");
            for m in round(&platform, t, r) {
                platform
                    .intake
                    .confirm_match_result(m.id, &ResultSubmission::winner(m.participants[0]))
                    .await
                    .unwrap();
            }
        }

        let finished = wait_for(|| {
            platform.store.tournament(&t).unwrap().status == TournamentStatus::Completed
                && !payouts(&platform).is_empty()
        })
        .await;
        runtime.shutdown().await;
        assert!(finished, "tournament never completed");

        let paid = payouts(&platform);
        assert_eq!(paid.len(), 1);
        let (champion, amount) = paid[0];
        assert_eq!(champion, ids[0]);
        assert_eq!(amount, 400);
        assert_eq!(platform.escrow.balance(champion).await.unwrap(), 1_300);

        let mut completions = Vec::new();
        while let Some(event) = events.try_recv() {
            if let PlatformEvent::TournamentCompleted { tournament, winner } = event {
                completions.push((tournament, winner));
            }
        }
        assert_eq!(completions, vec![(t, champion)]);

        let admin = platform.admin_console();
        admin.force_evaluation().await.unwrap();
        let deep = admin.run_reconciliation(true).await.unwrap();
        assert!(deep.passed, "{:?}", deep.failures);
        let invariants = admin.run_invariant_check().await.unwrap();
        assert!(invariants.passed, "{:?}", invariants.failures);
    }
}
