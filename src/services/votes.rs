//! # Vote Service
//!
//! Vote round lifecycle: choosing which phraseset a voter sees, taking
//! the vote dollar, recording the vote with immediate feedback, marking
//! the third/fifth-vote timeline, and finalizing under any of the three
//! closing conditions.
//!
//! Selection priority favors phrasesets closest to closing: sets in the
//! fifth-vote window first (oldest window first), then sets waiting out
//! the third-vote timeout, then young sets at random.
//!
//! Finalization is idempotent and runs under the per-phraseset lock, so
//! the submit path and the timer sweep can race it safely. Prize credits
//! go through the store's atomic commit; the advisory player lock is
//! only needed when a balance precondition is being checked, which
//! credits never have.

use std::sync::Arc;

use chrono::Duration;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::error::GameError;
use crate::models::{
    ActivityKind, Phraseset, PhrasesetStatus, PromptProgress, Round, RoundKind, RoundStatus,
    TransactionKind, Vote,
};
use crate::services::activity::ActivityService;
use crate::services::ledger::TransactionService;
use crate::services::queue::QueueService;
use crate::services::scoring::ScoringService;
use crate::services::validator::PhraseValidator;
use crate::store::GameStore;
use crate::utils::{Clock, LockManager};

/// What a voter is handed at round start: the phraseset with its three
/// phrases shuffled so position never reveals the original.
#[derive(Debug)]
pub struct StartedVoteRound {
    pub round: Round,
    pub phraseset_id: Uuid,
    pub prompt_text: String,
    pub phrases: Vec<String>,
}

/// Immediate feedback for a submitted vote.
#[derive(Debug)]
pub struct VoteOutcome {
    pub correct: bool,
    pub payout: i64,
    pub original_phrase: String,
    pub your_choice: String,
}

pub struct VoteService {
    config: Arc<GameConfig>,
    store: Arc<GameStore>,
    clock: Clock,
    locks: Arc<LockManager>,
    queue: Arc<QueueService>,
    ledger: Arc<TransactionService>,
    scoring: Arc<ScoringService>,
    activity: Arc<ActivityService>,
}

impl VoteService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<GameConfig>,
        store: Arc<GameStore>,
        clock: Clock,
        locks: Arc<LockManager>,
        queue: Arc<QueueService>,
        ledger: Arc<TransactionService>,
        scoring: Arc<ScoringService>,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
            locks,
            queue,
            ledger,
            scoring,
            activity,
        }
    }

    // ------------------------------------------------------------------
    // Eligibility and selection
    // ------------------------------------------------------------------

    /// Phrasesets the player may vote on: open or closing, not their own
    /// work, not yet voted on by them.
    pub async fn available_for_player(&self, player_id: Uuid) -> Vec<Phraseset> {
        let candidates = self.store.phrasesets_accepting_votes().await;
        if candidates.is_empty() {
            return Vec::new();
        }
        let voted = self.store.voted_phraseset_ids(player_id).await;

        let mut available = Vec::new();
        for phraseset in candidates {
            if voted.contains(&phraseset.phraseset_id) {
                continue;
            }
            let Ok((prompt_player, copy1_player, copy2_player)) =
                self.store.contributor_players(&phraseset).await
            else {
                continue;
            };
            if player_id == prompt_player
                || player_id == copy1_player
                || player_id == copy2_player
            {
                continue;
            }
            available.push(phraseset);
        }
        available
    }

    pub async fn count_available_for_player(&self, player_id: Uuid) -> usize {
        self.available_for_player(player_id).await.len()
    }

    /// Priority pick among the eligible sets.
    async fn select_for_player(&self, player_id: Uuid) -> Option<Phraseset> {
        let available = self.available_for_player(player_id).await;
        if available.is_empty() {
            return None;
        }

        let mut fifth_window: Vec<&Phraseset> = available
            .iter()
            .filter(|ps| ps.vote_count >= 5 && ps.fifth_vote_at.is_some())
            .collect();
        if !fifth_window.is_empty() {
            fifth_window.sort_by_key(|ps| ps.fifth_vote_at);
            return Some(fifth_window[0].clone());
        }

        let mut third_window: Vec<&Phraseset> = available
            .iter()
            .filter(|ps| (3..5).contains(&ps.vote_count) && ps.third_vote_at.is_some())
            .collect();
        if !third_window.is_empty() {
            third_window.sort_by_key(|ps| ps.third_vote_at);
            return Some(third_window[0].clone());
        }

        let young: Vec<&Phraseset> = available.iter().filter(|ps| ps.vote_count < 3).collect();
        if !young.is_empty() {
            return young.choose(&mut rand::thread_rng()).map(|ps| (*ps).clone());
        }

        available.choose(&mut rand::thread_rng()).cloned()
    }

    // ------------------------------------------------------------------
    // Vote rounds
    // ------------------------------------------------------------------

    /// Starts a vote round: picks a phraseset, debits the vote dollar,
    /// and hands back the shuffled phrases.
    ///
    /// # Arguments
    /// * `player_id` - The voter
    ///
    /// # Returns
    /// * `Ok(StartedVoteRound)` - The round, the chosen phraseset, and
    ///   its three phrases in a fresh random order
    /// * `Err(InsufficientBalance)` - Balance below the vote cost
    /// * `Err(AlreadyInRound)` - The player has a live active round
    /// * `Err(NoPhrasesetsAvailable)` - Nothing this voter is eligible
    ///   for
    pub async fn start_vote_round(&self, player_id: Uuid) -> Result<StartedVoteRound, GameError> {
        let _guard = self
            .locks
            .acquire(&LockManager::player_key(player_id))
            .await?;

        let player = self
            .store
            .player(player_id)
            .await
            .ok_or(GameError::PlayerNotFound)?;
        if player.active_round_id.is_some() {
            return Err(GameError::AlreadyInRound);
        }
        if player.balance < self.config.vote_cost {
            return Err(GameError::InsufficientBalance);
        }

        let phraseset = self
            .select_for_player(player_id)
            .await
            .ok_or(GameError::NoPhrasesetsAvailable)?;

        let now = self.clock.now();
        let round = Round {
            round_id: Uuid::new_v4(),
            player_id,
            status: RoundStatus::Active,
            cost: self.config.vote_cost,
            created_at: now,
            expires_at: now + Duration::seconds(self.config.vote_round_seconds),
            kind: RoundKind::Vote {
                phraseset_id: phraseset.phraseset_id,
                submitted_at: None,
            },
        };

        self.ledger
            .apply(
                player_id,
                -round.cost,
                TransactionKind::VoteEntry,
                Some(round.round_id),
                true,
            )
            .await?;
        self.store.insert_round(round.clone()).await;
        self.store
            .modify_player(player_id, |p| p.active_round_id = Some(round.round_id))
            .await?;

        let mut phrases: Vec<String> = phraseset.phrases().iter().map(|p| p.to_string()).collect();
        phrases.shuffle(&mut rand::thread_rng());

        tracing::info!(
            "started vote round {} on phraseset {}",
            round.round_id,
            phraseset.phraseset_id,
        );
        Ok(StartedVoteRound {
            round,
            phraseset_id: phraseset.phraseset_id,
            prompt_text: phraseset.prompt_text,
            phrases,
        })
    }

    /// Records the vote, credits a correct guess, advances the timeline,
    /// and evaluates finalization.
    ///
    /// # Arguments
    /// * `player_id` - The voter; must hold the active vote round for
    ///   this phraseset
    /// * `phraseset_id` - The phraseset being judged
    /// * `phrase` - The chosen phrase; compared after normalization
    ///
    /// # Returns
    /// * `Ok(VoteOutcome)` - Whether the guess was right, the payout,
    ///   and the revealed original
    /// * `Err(RoundExpired)` - Past the grace window (the vote dollar is
    ///   forfeited) or the set finalized first
    /// * `Err(AlreadyVoted)` - A second vote on the same phraseset
    /// * `Err(InvalidChoice)` - The phrase is not one of the three
    /// * `Err(RoundNotFound)` - No active vote round for this phraseset
    pub async fn submit_vote(
        &self,
        player_id: Uuid,
        phraseset_id: Uuid,
        phrase: &str,
    ) -> Result<VoteOutcome, GameError> {
        let _player_guard = self
            .locks
            .acquire(&LockManager::player_key(player_id))
            .await?;

        let player = self
            .store
            .player(player_id)
            .await
            .ok_or(GameError::PlayerNotFound)?;
        let round_id = player.active_round_id.ok_or(GameError::RoundNotFound)?;
        let round = self
            .store
            .round(round_id)
            .await
            .ok_or(GameError::RoundNotFound)?;
        match &round.kind {
            RoundKind::Vote {
                phraseset_id: active_set,
                ..
            } if *active_set == phraseset_id => {}
            _ => return Err(GameError::RoundNotFound),
        }
        if round.status != RoundStatus::Active {
            return Err(GameError::RoundExpired);
        }

        let now = self.clock.now();
        if round.is_past_grace(now, self.config.grace_period_seconds) {
            self.expire_vote_round_locked(player_id, round_id).await?;
            return Err(GameError::RoundExpired);
        }

        let _phraseset_guard = self
            .locks
            .acquire(&LockManager::phraseset_key(phraseset_id))
            .await?;

        let phraseset = self
            .store
            .phraseset(phraseset_id)
            .await
            .ok_or(GameError::PhrasesetNotFound)?;
        if !phraseset.accepts_votes() {
            // Finalized while the voter deliberated; the round is dead.
            self.expire_vote_round_locked(player_id, round_id).await?;
            return Err(GameError::RoundExpired);
        }

        let (prompt_player, copy1_player, copy2_player) =
            self.store.contributor_players(&phraseset).await?;
        if player_id == prompt_player || player_id == copy1_player || player_id == copy2_player {
            return Err(GameError::NotContributor);
        }
        if self.store.has_vote(player_id, phraseset_id).await {
            return Err(GameError::AlreadyVoted);
        }

        let choice = PhraseValidator::normalize(phrase);
        if !phraseset.phrases().contains(&choice.as_str()) {
            return Err(GameError::InvalidChoice);
        }

        let correct = choice == phraseset.original_phrase;
        let payout = if correct {
            self.config.vote_payout_correct
        } else {
            0
        };

        let vote = Vote {
            vote_id: Uuid::new_v4(),
            phraseset_id,
            player_id,
            voted_phrase: choice.clone(),
            correct,
            payout,
            created_at: now,
        };
        self.store.insert_vote(vote.clone()).await;

        if correct {
            self.ledger
                .apply(
                    player_id,
                    payout,
                    TransactionKind::VotePayout,
                    Some(vote.vote_id),
                    true,
                )
                .await?;
        }

        self.store
            .modify_round(round_id, |r| {
                r.status = RoundStatus::Submitted;
                if let RoundKind::Vote { submitted_at, .. } = &mut r.kind {
                    *submitted_at = Some(now);
                }
            })
            .await?;
        self.store
            .modify_player(player_id, |p| {
                if p.active_round_id == Some(round_id) {
                    p.active_round_id = None;
                }
            })
            .await?;

        // Vote count and timeline marks, totally ordered by the
        // phraseset lock.
        let updated = self
            .store
            .modify_phraseset(phraseset_id, |ps| {
                ps.vote_count += 1;
                if ps.vote_count == 3 && ps.third_vote_at.is_none() {
                    ps.third_vote_at = Some(now);
                }
                if ps.vote_count == 5 && ps.fifth_vote_at.is_none() {
                    ps.fifth_vote_at = Some(now);
                    ps.status = PhrasesetStatus::Closing;
                    ps.closes_at =
                        Some(now + Duration::seconds(self.config.fifth_vote_close_seconds));
                }
            })
            .await?;
        if updated.vote_count == 3 {
            tracing::info!("phraseset {} reached 3rd vote", phraseset_id);
        }
        if updated.vote_count == 5 {
            tracing::info!("phraseset {} reached 5th vote, closing window open", phraseset_id);
        }

        self.activity
            .record(
                ActivityKind::VoteCast,
                Some(phraseset_id),
                None,
                Some(player_id),
            )
            .await;

        self.maybe_finalize_locked(phraseset_id).await?;

        tracing::info!(
            "vote submitted: phraseset={}, player={}, correct={}, payout={}",
            phraseset_id,
            player_id,
            correct,
            payout,
        );
        Ok(VoteOutcome {
            correct,
            payout,
            original_phrase: phraseset.original_phrase,
            your_choice: choice,
        })
    }

    /// Expires a vote round in place; the vote dollar is forfeited.
    async fn expire_vote_round_locked(
        &self,
        player_id: Uuid,
        round_id: Uuid,
    ) -> Result<(), GameError> {
        self.store
            .modify_round(round_id, |r| {
                if r.status == RoundStatus::Active {
                    r.status = RoundStatus::Expired;
                }
            })
            .await?;
        self.store
            .modify_player(player_id, |p| {
                if p.active_round_id == Some(round_id) {
                    p.active_round_id = None;
                }
            })
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// Evaluates the closing conditions and finalizes if one holds.
    /// Entry point for the timer sweep; takes the phraseset lock.
    pub async fn maybe_finalize(&self, phraseset_id: Uuid) -> Result<(), GameError> {
        let _guard = self
            .locks
            .acquire(&LockManager::phraseset_key(phraseset_id))
            .await?;
        self.maybe_finalize_locked(phraseset_id).await
    }

    async fn maybe_finalize_locked(&self, phraseset_id: Uuid) -> Result<(), GameError> {
        let Some(phraseset) = self.store.phraseset(phraseset_id).await else {
            return Ok(());
        };
        if phraseset.status == PhrasesetStatus::Finalized {
            return Ok(());
        }

        let now = self.clock.now();
        let max_votes = phraseset.vote_count >= self.config.vote_finalize_max;
        let fifth_window_elapsed = phraseset.vote_count >= 5
            && phraseset
                .fifth_vote_at
                .is_some_and(|at| now - at >= Duration::seconds(self.config.fifth_vote_close_seconds));
        let third_window_elapsed = phraseset.vote_count >= 3
            && phraseset.fifth_vote_at.is_none()
            && phraseset
                .third_vote_at
                .is_some_and(|at| now - at >= Duration::seconds(self.config.third_vote_timeout_seconds));

        if max_votes || fifth_window_elapsed || third_window_elapsed {
            self.finalize_locked(&phraseset).await?;
        }
        Ok(())
    }

    /// Computes payouts, writes the prize transactions, and locks the
    /// phraseset. Runs at most once per phraseset.
    async fn finalize_locked(&self, phraseset: &Phraseset) -> Result<(), GameError> {
        let (prompt_player, copy1_player, copy2_player) =
            self.store.contributor_players(phraseset).await?;
        let votes = self.store.votes_for_phraseset(phraseset.phraseset_id).await;
        let breakdown =
            self.scoring
                .calculate(phraseset, &votes, prompt_player, copy1_player, copy2_player);

        for share in breakdown.shares() {
            if share.payout > 0 {
                self.ledger
                    .apply(
                        share.player_id,
                        share.payout,
                        TransactionKind::PrizePayout,
                        Some(phraseset.phraseset_id),
                        true,
                    )
                    .await?;
            }
        }

        let now = self.clock.now();
        self.store
            .modify_phraseset(phraseset.phraseset_id, |ps| {
                ps.status = PhrasesetStatus::Finalized;
                ps.finalized_at = Some(now);
            })
            .await?;
        self.store
            .modify_round(phraseset.prompt_round_id, |r| {
                if let RoundKind::Prompt { phraseset_status, .. } = &mut r.kind {
                    *phraseset_status = PromptProgress::Finalized;
                }
            })
            .await?;
        self.queue.remove_phraseset(phraseset.phraseset_id).await;
        self.activity
            .record(
                ActivityKind::Finalized,
                Some(phraseset.phraseset_id),
                None,
                None,
            )
            .await;

        tracing::info!(
            "finalized phraseset {}: original={}, copy1={}, copy2={}",
            phraseset.phraseset_id,
            breakdown.original.payout,
            breakdown.copy1.payout,
            breakdown.copy2.payout,
        );
        Ok(())
    }
}
