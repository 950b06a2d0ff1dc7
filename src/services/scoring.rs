//! # Scoring
//!
//! Pure payout arithmetic for a finalized phraseset. The original phrase
//! earns 1 point per vote it received; each copy earns 2 per vote, since
//! selling a fake is the harder job. Correct-voter payouts come off the
//! top of the pool, the rest is split proportionally to points with
//! integer floor division, and the remainder stays with the system.
//!
//! Calling this repeatedly on the same inputs is safe; the vote service
//! commits the derived prize transactions exactly once at finalization.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::models::{Phraseset, Vote};

/// One contributor's slice of the result.
#[derive(Debug, Clone, Serialize)]
pub struct ContributorPayout {
    pub player_id: Uuid,
    pub phrase: String,
    pub vote_count: u32,
    pub points: i64,
    pub payout: i64,
}

/// Full payout computation for a phraseset.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutBreakdown {
    pub prize_pool: i64,
    pub correct_votes: u32,
    pub total_points: i64,
    pub original: ContributorPayout,
    pub copy1: ContributorPayout,
    pub copy2: ContributorPayout,
}

impl PayoutBreakdown {
    pub fn shares(&self) -> [&ContributorPayout; 3] {
        [&self.original, &self.copy1, &self.copy2]
    }

    pub fn for_player(&self, player_id: Uuid) -> Option<&ContributorPayout> {
        self.shares()
            .into_iter()
            .find(|share| share.player_id == player_id)
    }
}

pub struct ScoringService {
    config: Arc<GameConfig>,
}

impl ScoringService {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self { config }
    }

    /// Computes points and payouts from the persisted phraseset, its
    /// votes, and the three contributor ids.
    pub fn calculate(
        &self,
        phraseset: &Phraseset,
        votes: &[Vote],
        prompt_player: Uuid,
        copy1_player: Uuid,
        copy2_player: Uuid,
    ) -> PayoutBreakdown {
        let count_for = |phrase: &str| -> u32 {
            votes.iter().filter(|v| v.voted_phrase == phrase).count() as u32
        };

        let original_votes = count_for(&phraseset.original_phrase);
        let copy1_votes = count_for(&phraseset.copy_phrase_1);
        let copy2_votes = count_for(&phraseset.copy_phrase_2);

        let original_points = original_votes as i64;
        let copy1_points = copy1_votes as i64 * 2;
        let copy2_points = copy2_votes as i64 * 2;
        let total_points = original_points + copy1_points + copy2_points;

        let correct_votes = original_votes;
        let prize_pool =
            phraseset.total_pool - correct_votes as i64 * self.config.vote_payout_correct;

        let (original_payout, copy1_payout, copy2_payout) = if total_points == 0 {
            let third = prize_pool / 3;
            (third, third, third)
        } else {
            (
                original_points * prize_pool / total_points,
                copy1_points * prize_pool / total_points,
                copy2_points * prize_pool / total_points,
            )
        };

        PayoutBreakdown {
            prize_pool,
            correct_votes,
            total_points,
            original: ContributorPayout {
                player_id: prompt_player,
                phrase: phraseset.original_phrase.clone(),
                vote_count: original_votes,
                points: original_points,
                payout: original_payout,
            },
            copy1: ContributorPayout {
                player_id: copy1_player,
                phrase: phraseset.copy_phrase_1.clone(),
                vote_count: copy1_votes,
                points: copy1_points,
                payout: copy1_payout,
            },
            copy2: ContributorPayout {
                player_id: copy2_player,
                phrase: phraseset.copy_phrase_2.clone(),
                vote_count: copy2_votes,
                points: copy2_points,
                payout: copy2_payout,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhrasesetStatus;
    use chrono::Utc;

    fn phraseset(total_pool: i64) -> Phraseset {
        Phraseset {
            phraseset_id: Uuid::new_v4(),
            prompt_round_id: Uuid::new_v4(),
            copy_round_1_id: Uuid::new_v4(),
            copy_round_2_id: Uuid::new_v4(),
            prompt_text: "things worth fighting for".to_string(),
            original_phrase: "FREEDOM".to_string(),
            copy_phrase_1: "LIBERTY".to_string(),
            copy_phrase_2: "JUSTICE".to_string(),
            status: PhrasesetStatus::Finalized,
            vote_count: 0,
            third_vote_at: None,
            fifth_vote_at: None,
            closes_at: None,
            total_pool,
            system_contribution: 0,
            created_at: Utc::now(),
            finalized_at: Some(Utc::now()),
        }
    }

    fn vote(phraseset: &Phraseset, phrase: &str) -> Vote {
        Vote {
            vote_id: Uuid::new_v4(),
            phraseset_id: phraseset.phraseset_id,
            player_id: Uuid::new_v4(),
            voted_phrase: phrase.to_string(),
            correct: phrase == phraseset.original_phrase,
            payout: if phrase == phraseset.original_phrase { 5 } else { 0 },
            created_at: Utc::now(),
        }
    }

    fn scoring() -> ScoringService {
        ScoringService::new(Arc::new(GameConfig::default()))
    }

    #[test]
    fn proportional_split_with_floor_division() {
        let ps = phraseset(300);
        let votes: Vec<Vote> = ["FREEDOM", "FREEDOM", "FREEDOM", "LIBERTY", "JUSTICE"]
            .iter()
            .map(|p| vote(&ps, p))
            .collect();

        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let breakdown = scoring().calculate(&ps, &votes, a, b, c);

        assert_eq!(breakdown.correct_votes, 3);
        assert_eq!(breakdown.prize_pool, 285);
        assert_eq!(breakdown.total_points, 7);
        assert_eq!(breakdown.original.payout, 122);
        assert_eq!(breakdown.copy1.payout, 81);
        assert_eq!(breakdown.copy2.payout, 81);

        // Remainder stays with the system and is bounded.
        let paid: i64 = breakdown.shares().iter().map(|s| s.payout).sum();
        assert!(breakdown.prize_pool - paid <= 2);
    }

    #[test]
    fn zero_points_splits_into_thirds() {
        let ps = phraseset(300);
        let breakdown =
            scoring().calculate(&ps, &[], Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(breakdown.prize_pool, 300);
        assert_eq!(breakdown.original.payout, 100);
        assert_eq!(breakdown.copy1.payout, 100);
        assert_eq!(breakdown.copy2.payout, 100);
    }

    #[test]
    fn correct_votes_come_out_of_the_pool() {
        let ps = phraseset(310);
        let votes: Vec<Vote> = ["FREEDOM", "FREEDOM", "LIBERTY"]
            .iter()
            .map(|p| vote(&ps, p))
            .collect();
        let breakdown =
            scoring().calculate(&ps, &votes, Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        // pool 310 - 2 correct * 5 = 300; points 2 / 4 / 0.
        assert_eq!(breakdown.prize_pool, 300);
        assert_eq!(breakdown.original.payout, 100);
        assert_eq!(breakdown.copy1.payout, 200);
        assert_eq!(breakdown.copy2.payout, 0);
    }

    #[test]
    fn conservation_holds_across_vote_patterns() {
        let ps = phraseset(320);
        let patterns: &[&[&str]] = &[
            &["FREEDOM"],
            &["LIBERTY", "JUSTICE"],
            &["FREEDOM", "LIBERTY", "JUSTICE", "JUSTICE", "FREEDOM"],
        ];
        for pattern in patterns {
            let votes: Vec<Vote> = pattern.iter().map(|p| vote(&ps, p)).collect();
            let breakdown =
                scoring().calculate(&ps, &votes, Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
            let paid: i64 = breakdown.shares().iter().map(|s| s.payout).sum();
            let correct_payouts = breakdown.correct_votes as i64 * 5;
            assert!(paid + correct_payouts <= ps.total_pool);
            assert!(ps.total_pool - correct_payouts - paid <= 2);
        }
    }
}
