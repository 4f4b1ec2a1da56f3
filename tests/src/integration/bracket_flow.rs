//! # Bracket Flow
//!
//! Single-elimination brackets driven through intake and the tournament
//! queue until a champion is paid.

#[cfg(test)]
mod tests {
    use shared_types::{Match, TournamentId, TournamentStatus, TransactionKind, UserId};

    use crate::integration::harness::Harness;

    fn tournament_matches(h: &Harness, t: TournamentId) -> Vec<Match> {
        h.platform
            .store
            .read(|c| {
                c.matches
                    .values()
                    .filter(|m| m.tournament == Some(t))
                    .cloned()
                    .collect()
            })
            .unwrap()
    }

    /// Play every round with the first-listed participant winning.
    async fn play_out(h: &Harness, t: TournamentId) -> u32 {
        let mut round = 1;
        loop {
            h.confirm_round(t, round).await;
            h.drain().await;
            if h.round(t, round + 1).is_empty() {
                return round;
            }
            round += 1;
        }
    }

    // =========================================================================
    // POWER-OF-TWO BRACKETS
    // =========================================================================

    #[tokio::test]
    async fn test_power_of_two_brackets_crown_one_champion() {
        for n in 1..=4u32 {
            let h = Harness::new();
            let size = 1usize << n;
            let (t, players) = h.seeded_tournament(size, 50).await;

            let rounds = play_out(&h, t).await;
            assert_eq!(rounds, n, "size {size}");

            let matches = tournament_matches(&h, t);
            assert_eq!(matches.len(), size - 1, "size {size}");
            assert!(matches.iter().all(|m| m.is_completed()));
            assert!(matches.iter().all(|m| !m.is_bye()));

            let tournament = h.platform.store.tournament(&t).unwrap();
            assert_eq!(tournament.status, TournamentStatus::Completed);

            let champions: Vec<UserId> = players
                .iter()
                .copied()
                .filter(|p| {
                    let c = h.platform.store.competitor(p).unwrap();
                    !c.badges.is_empty()
                })
                .collect();
            assert_eq!(champions, vec![players[0]], "size {size}");
            assert_eq!(h.completed_count(TransactionKind::PrizePayout), 1);
            assert!(h.supply_balanced());
        }
    }

    // =========================================================================
    // BYES
    // =========================================================================

    #[tokio::test]
    async fn test_odd_round_bye_advances_straight_through() {
        let h = Harness::new();
        let (t, _) = h.seeded_tournament(6, 20).await;
        assert_eq!(h.round(t, 1).len(), 3);

        h.confirm_round(t, 1).await;
        h.drain().await;

        let round2 = h.round(t, 2);
        assert_eq!(round2.len(), 2);
        let byes: Vec<&Match> = round2.iter().filter(|m| m.is_bye()).collect();
        assert_eq!(byes.len(), 1);
        let bye = byes[0];
        assert!(bye.is_completed());
        let bye_winner = bye.winner.unwrap();
        assert!(h.round(t, 3).is_empty());

        h.confirm_round(t, 2).await;
        h.drain().await;

        let round3 = h.round(t, 3);
        assert_eq!(round3.len(), 1);
        assert!(round3[0].participants.contains(&bye_winner));

        h.confirm_round(t, 3).await;
        h.drain().await;
        assert_eq!(
            h.platform.store.tournament(&t).unwrap().status,
            TournamentStatus::Completed
        );
        assert_eq!(h.completed_count(TransactionKind::PrizePayout), 1);
    }
}
