//! Result validation per scoring type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::{Classify, ErrorClass, MatchResult, ScoringType, UserId};
use thiserror::Error;

/// Why a submitted result was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResultValidationError {
    #[error("Winner must be selected")]
    MissingWinner,

    #[error("Winner {0} is not a participant")]
    WinnerNotParticipant(UserId),

    #[error("Missing score for participant {0}")]
    MissingScore(UserId),

    #[error("Invalid score value {score} for participant {participant}")]
    NegativeScore { participant: UserId, score: i64 },

    #[error("Scores are required")]
    NoScores,

    #[error("Draws are not supported, play overtime")]
    Draw,

    #[error("Missing placement for participant {0}")]
    MissingPlacement(UserId),

    #[error("Placements start at 1, participant {0} has 0")]
    ZeroPlacement(UserId),

    #[error("Placements are required")]
    NoPlacements,

    #[error("Two participants share first place")]
    SharedFirstPlace,
}

impl Classify for ResultValidationError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Validation
    }
}

/// A submitted result. Which fields are read depends on the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubmission {
    /// Win-loss games: the declared winner.
    pub winner: Option<UserId>,
    /// Round-based games: rounds won per participant.
    #[serde(default)]
    pub scores: BTreeMap<UserId, i64>,
    /// Points-based games: finishing placement per participant, 1 = first.
    #[serde(default)]
    pub placements: BTreeMap<UserId, u32>,
}

impl ResultSubmission {
    pub fn winner(winner: UserId) -> Self {
        Self {
            winner: Some(winner),
            ..Self::default()
        }
    }

    pub fn scores(scores: impl IntoIterator<Item = (UserId, i64)>) -> Self {
        Self {
            scores: scores.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn placements(placements: impl IntoIterator<Item = (UserId, u32)>) -> Self {
        Self {
            placements: placements.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// A result that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedResult {
    pub winner: UserId,
    /// Display summary.
    pub score: String,
    pub result: MatchResult,
}

/// Validate `submission` for a match between `participants`.
pub fn validate_result(
    scoring: ScoringType,
    participants: &[UserId],
    submission: &ResultSubmission,
) -> Result<ValidatedResult, ResultValidationError> {
    match scoring {
        ScoringType::WinLoss => {
            let winner = submission
                .winner
                .ok_or(ResultValidationError::MissingWinner)?;
            if !participants.contains(&winner) {
                return Err(ResultValidationError::WinnerNotParticipant(winner));
            }
            Ok(ValidatedResult {
                winner,
                score: "Win".to_string(),
                result: MatchResult::default(),
            })
        }
        ScoringType::RoundBased => {
            let mut parts = Vec::with_capacity(participants.len());
            let mut best: Option<(UserId, i64)> = None;
            let mut tied = false;
            for p in participants {
                let score = *submission
                    .scores
                    .get(p)
                    .ok_or(ResultValidationError::MissingScore(*p))?;
                if score < 0 {
                    return Err(ResultValidationError::NegativeScore {
                        participant: *p,
                        score,
                    });
                }
                parts.push(score.to_string());
                match best {
                    Some((_, high)) if score == high => tied = true,
                    Some((_, high)) if score < high => {}
                    _ => {
                        best = Some((*p, score));
                        tied = false;
                    }
                }
            }
            let (winner, _) = best.ok_or(ResultValidationError::NoScores)?;
            if tied {
                return Err(ResultValidationError::Draw);
            }
            Ok(ValidatedResult {
                winner,
                score: parts.join("-"),
                result: MatchResult {
                    scores: submission.scores.clone(),
                    ..MatchResult::default()
                },
            })
        }
        ScoringType::PointsBased => {
            let mut ranked = Vec::with_capacity(participants.len());
            for p in participants {
                let placement = *submission
                    .placements
                    .get(p)
                    .ok_or(ResultValidationError::MissingPlacement(*p))?;
                if placement == 0 {
                    return Err(ResultValidationError::ZeroPlacement(*p));
                }
                ranked.push((placement, *p));
            }
            ranked.sort();
            let (first, winner) = *ranked
                .first()
                .ok_or(ResultValidationError::NoPlacements)?;
            if ranked.get(1).is_some_and(|(second, _)| *second == first) {
                return Err(ResultValidationError::SharedFirstPlace);
            }
            Ok(ValidatedResult {
                winner,
                score: format!("Placement: {first}"),
                result: MatchResult {
                    placements: submission.placements.clone(),
                    ..MatchResult::default()
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (UserId, UserId) {
        (UserId::new(), UserId::new())
    }

    #[test]
    fn test_win_loss_requires_participant_winner() {
        let (a, b) = pair();
        let ok = validate_result(ScoringType::WinLoss, &[a, b], &ResultSubmission::winner(b));
        assert_eq!(ok.unwrap().winner, b);

        let outsider = UserId::new();
        assert_eq!(
            validate_result(
                ScoringType::WinLoss,
                &[a, b],
                &ResultSubmission::winner(outsider)
            ),
            Err(ResultValidationError::WinnerNotParticipant(outsider))
        );
        assert_eq!(
            validate_result(ScoringType::WinLoss, &[a, b], &ResultSubmission::default()),
            Err(ResultValidationError::MissingWinner)
        );
    }

    #[test]
    fn test_round_based_highest_wins() {
        let (a, b) = pair();
        let v = validate_result(
            ScoringType::RoundBased,
            &[a, b],
            &ResultSubmission::scores([(a, 11), (b, 13)]),
        )
        .unwrap();
        assert_eq!(v.winner, b);
        assert_eq!(v.score, "11-13");
        assert_eq!(v.result.scores[&a], 11);
    }

    #[test]
    fn test_round_based_rejects_draw_and_negative() {
        let (a, b) = pair();
        let draw = validate_result(
            ScoringType::RoundBased,
            &[a, b],
            &ResultSubmission::scores([(a, 12), (b, 12)]),
        );
        assert_eq!(draw.unwrap_err(), ResultValidationError::Draw);

        assert_eq!(
            validate_result(
                ScoringType::RoundBased,
                &[a, b],
                &ResultSubmission::scores([(a, -1), (b, 3)]),
            ),
            Err(ResultValidationError::NegativeScore {
                participant: a,
                score: -1
            })
        );
        assert_eq!(
            validate_result(
                ScoringType::RoundBased,
                &[a, b],
                &ResultSubmission::scores([(a, 3)]),
            ),
            Err(ResultValidationError::MissingScore(b))
        );
    }

    #[test]
    fn test_points_based_best_placement_wins() {
        let (a, b) = pair();
        let c = UserId::new();
        let v = validate_result(
            ScoringType::PointsBased,
            &[a, b, c],
            &ResultSubmission::placements([(a, 3), (b, 1), (c, 2)]),
        )
        .unwrap();
        assert_eq!(v.winner, b);
        assert_eq!(v.score, "Placement: 1");

        let shared = validate_result(
            ScoringType::PointsBased,
            &[a, b],
            &ResultSubmission::placements([(a, 1), (b, 1)]),
        )
        .unwrap_err();
        assert_eq!(shared, ResultValidationError::SharedFirstPlace);
        assert_eq!(shared.class(), ErrorClass::Validation);
    }
}
