//! # Round Coordinator
//!
//! Creates and terminates prompt and copy rounds, owns the expiry/grace
//! policy, and builds phrasesets when the second copy lands.
//!
//! Every mutation runs inside the caller's per-player advisory lock.
//! Entry fees are debited before the round row is inserted, so a failed
//! debit leaves no round behind; a popped prompt that fails a later
//! precondition is pushed back to the queue head so it is never lost.
//!
//! Copy validation calls the embedding backend over the network, so it
//! happens *before* the player lock is taken; the round state is
//! re-checked once the lock is held.

use std::sync::Arc;

use chrono::Duration;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::error::GameError;
use crate::models::{
    AbandonedPrompt, ActivityKind, Phraseset, PhrasesetStatus, PromptProgress, Round, RoundKind,
    RoundStatus, TransactionKind,
};
use crate::services::activity::ActivityService;
use crate::services::ledger::TransactionService;
use crate::services::queue::QueueService;
use crate::services::validator::PhraseValidator;
use crate::store::GameStore;
use crate::utils::{Clock, LockManager};

/// A freshly started copy round plus the discount flag the client sees.
#[derive(Debug)]
pub struct StartedCopyRound {
    pub round: Round,
    pub discount_active: bool,
}

pub struct RoundService {
    config: Arc<GameConfig>,
    store: Arc<GameStore>,
    clock: Clock,
    locks: Arc<LockManager>,
    queue: Arc<QueueService>,
    ledger: Arc<TransactionService>,
    validator: Arc<PhraseValidator>,
    activity: Arc<ActivityService>,
}

impl RoundService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<GameConfig>,
        store: Arc<GameStore>,
        clock: Clock,
        locks: Arc<LockManager>,
        queue: Arc<QueueService>,
        ledger: Arc<TransactionService>,
        validator: Arc<PhraseValidator>,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
            locks,
            queue,
            ledger,
            validator,
            activity,
        }
    }

    // ------------------------------------------------------------------
    // Prompt rounds
    // ------------------------------------------------------------------

    /// Starts a prompt round: debits the entry fee, assigns a random
    /// enabled prompt, and arms the round timer.
    ///
    /// # Arguments
    /// * `player_id` - The player opening the round
    ///
    /// # Returns
    /// * `Ok(Round)` - The active round, carrying its prompt text,
    ///   expiry, and cost
    /// * `Err(InsufficientBalance)` - Balance below the entry fee
    /// * `Err(AlreadyInRound)` - The player has a live active round
    /// * `Err(MaxOutstandingPrompts)` - Too many open phrasesets already
    ///   fed by this player's prompts
    /// * `Err(NoPromptsEnabled)` - The prompt library is empty
    pub async fn start_prompt_round(&self, player_id: Uuid) -> Result<Round, GameError> {
        let _guard = self
            .locks
            .acquire(&LockManager::player_key(player_id))
            .await?;

        let player = self.require_idle_player(player_id).await?;
        if player.balance < self.config.prompt_cost {
            return Err(GameError::InsufficientBalance);
        }
        let outstanding = self.store.outstanding_prompt_count(player_id).await;
        if outstanding >= self.config.max_outstanding_prompts {
            return Err(GameError::MaxOutstandingPrompts);
        }

        let prompts = self.store.enabled_prompts().await;
        let prompt = prompts
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(GameError::NoPromptsEnabled)?;

        let now = self.clock.now();
        let round = Round {
            round_id: Uuid::new_v4(),
            player_id,
            status: RoundStatus::Active,
            cost: self.config.prompt_cost,
            created_at: now,
            expires_at: now + Duration::seconds(self.config.prompt_round_seconds),
            kind: RoundKind::Prompt {
                prompt_id: prompt.prompt_id,
                prompt_text: prompt.text.clone(),
                submitted_phrase: None,
                phraseset_status: PromptProgress::WaitingCopies,
                copy1_player_id: None,
                copy2_player_id: None,
            },
        };

        self.ledger
            .apply(
                player_id,
                -round.cost,
                TransactionKind::PromptEntry,
                Some(round.round_id),
                true,
            )
            .await?;

        self.store.insert_round(round.clone()).await;
        self.store.increment_prompt_usage(prompt.prompt_id).await;
        self.store
            .modify_player(player_id, |p| p.active_round_id = Some(round.round_id))
            .await?;

        tracing::info!("started prompt round {} for player {}", round.round_id, player_id);
        Ok(round)
    }

    /// Submits the prompt player's phrase and enqueues the prompt for
    /// copying.
    ///
    /// # Arguments
    /// * `player_id` - The round's owner
    /// * `round_id` - The active prompt round being answered
    /// * `phrase` - The raw phrase as typed; normalization happens here
    ///
    /// # Returns
    /// * `Ok(String)` - The normalized (trimmed, uppercased) phrase
    /// * `Err(InvalidPhrase | PhraseTooSimilar)` - Validation failure
    ///   with a human-readable reason
    /// * `Err(RoundExpired)` - Past the grace window; the round is
    ///   settled and refunded on this path
    /// * `Err(RoundNotFound)` - Unknown round, wrong owner, or already
    ///   submitted
    pub async fn submit_prompt_phrase(
        &self,
        player_id: Uuid,
        round_id: Uuid,
        phrase: &str,
    ) -> Result<String, GameError> {
        let _guard = self
            .locks
            .acquire(&LockManager::player_key(player_id))
            .await?;

        let round = self.require_active_round(player_id, round_id).await?;
        let prompt_text = match &round.kind {
            RoundKind::Prompt { prompt_text, .. } => prompt_text.clone(),
            _ => return Err(GameError::RoundNotFound),
        };

        if round.is_past_grace(self.clock.now(), self.config.grace_period_seconds) {
            self.timeout_round_locked(&round).await?;
            return Err(GameError::RoundExpired);
        }

        let normalized = self
            .validator
            .validate_prompt_phrase(phrase, &prompt_text)?;

        self.store
            .modify_round(round_id, |r| {
                r.status = RoundStatus::Submitted;
                if let RoundKind::Prompt { submitted_phrase, .. } = &mut r.kind {
                    *submitted_phrase = Some(normalized.clone());
                }
            })
            .await?;
        self.clear_active_round(player_id, round_id).await?;

        self.queue.push_prompt(round_id).await;
        self.activity
            .record(
                ActivityKind::PromptCreated,
                None,
                Some(round_id),
                Some(player_id),
            )
            .await;

        tracing::info!("prompt round {} submitted: {}", round_id, normalized);
        Ok(normalized)
    }

    // ------------------------------------------------------------------
    // Copy rounds
    // ------------------------------------------------------------------

    /// Starts a copy round by leasing the oldest eligible prompt from
    /// the queue. The discount predicate is evaluated against the queue
    /// as the caller saw it, before the pop.
    ///
    /// # Arguments
    /// * `player_id` - The player drawing a prompt to copy
    ///
    /// # Returns
    /// * `Ok(StartedCopyRound)` - The active round plus the discount
    ///   flag that priced it
    /// * `Err(InsufficientBalance)` - Balance below the current copy
    ///   cost
    /// * `Err(AlreadyInRound)` - The player has a live active round
    /// * `Err(NoPromptsAvailable)` - Nothing in the queue this player
    ///   may draw (own prompts and cooldown entries are skipped)
    ///
    /// # Example
    /// ```rust,ignore
    /// let started = rounds.start_copy_round(player_id).await?;
    /// println!("copy {} for {}", started.round.cost, started.round.round_id);
    /// ```
    pub async fn start_copy_round(&self, player_id: Uuid) -> Result<StartedCopyRound, GameError> {
        let _guard = self
            .locks
            .acquire(&LockManager::player_key(player_id))
            .await?;

        let player = self.require_idle_player(player_id).await?;

        let discount_active = self.queue.copy_discount_active().await;
        let cost = if discount_active {
            self.config.copy_cost_discount
        } else {
            self.config.copy_cost_normal
        };
        if player.balance < cost {
            return Err(GameError::InsufficientBalance);
        }

        let prompt_round = self.lease_prompt_for(player_id).await?;
        let original_phrase = match &prompt_round.kind {
            RoundKind::Prompt {
                submitted_phrase: Some(phrase),
                ..
            } => phrase.clone(),
            _ => {
                return Err(GameError::StateMachineViolation(
                    "queued prompt round has no submitted phrase".to_string(),
                ))
            }
        };

        let system_contribution = if discount_active {
            self.config.copy_cost_normal - cost
        } else {
            0
        };

        let now = self.clock.now();
        let round = Round {
            round_id: Uuid::new_v4(),
            player_id,
            status: RoundStatus::Active,
            cost,
            created_at: now,
            expires_at: now + Duration::seconds(self.config.copy_round_seconds),
            kind: RoundKind::Copy {
                prompt_round_id: prompt_round.round_id,
                original_phrase,
                submitted_phrase: None,
                system_contribution,
            },
        };

        if let Err(e) = self
            .ledger
            .apply(
                player_id,
                -cost,
                TransactionKind::CopyEntry,
                Some(round.round_id),
                true,
            )
            .await
        {
            // Compensating push-back: the lease must not eat the prompt.
            self.queue.requeue_front(vec![prompt_round.round_id]).await;
            return Err(e);
        }

        self.store.insert_round(round.clone()).await;
        self.store
            .modify_player(player_id, |p| p.active_round_id = Some(round.round_id))
            .await?;

        tracing::info!(
            "started copy round {} for player {}, cost={}, discount={}",
            round.round_id,
            player_id,
            cost,
            discount_active,
        );
        Ok(StartedCopyRound {
            round,
            discount_active,
        })
    }

    /// Pops prompts until one is eligible for this player; skipped
    /// entries go back to the queue head in order.
    async fn lease_prompt_for(&self, player_id: Uuid) -> Result<Round, GameError> {
        let cutoff = self.clock.now() - Duration::hours(self.config.abandonment_cooldown_hours);
        let mut skipped: Vec<Uuid> = Vec::new();
        let mut selected: Option<Round> = None;

        while let Some(candidate_id) = self.queue.pop_prompt().await {
            let Some(candidate) = self.store.round(candidate_id).await else {
                // Stale entry; drop it.
                continue;
            };
            let is_live_prompt = candidate.status == RoundStatus::Submitted
                && matches!(candidate.kind, RoundKind::Prompt { .. })
                && self
                    .store
                    .phraseset_for_prompt_round(candidate_id)
                    .await
                    .is_none();
            if !is_live_prompt {
                continue;
            }

            let own_prompt = candidate.player_id == player_id;
            let recently_abandoned = self
                .store
                .has_recent_abandonment(player_id, candidate_id, cutoff)
                .await;
            let already_copying = self
                .store
                .player_has_copy_for_prompt(player_id, candidate_id)
                .await;
            if own_prompt || recently_abandoned || already_copying {
                skipped.push(candidate_id);
                continue;
            }

            selected = Some(candidate);
            break;
        }

        self.queue.requeue_front(skipped).await;
        selected.ok_or(GameError::NoPromptsAvailable)
    }

    /// Submits a copy phrase. Validation (including the embedding call)
    /// runs before the player lock is taken; the round is re-checked
    /// under the lock before anything is written.
    ///
    /// # Arguments
    /// * `player_id` - The round's owner
    /// * `round_id` - The active copy round being answered
    /// * `phrase` - The raw copy phrase as typed
    ///
    /// # Returns
    /// * `Ok(String)` - The normalized phrase; the second accepted copy
    ///   also materializes the phraseset as a side effect
    /// * `Err(InvalidPhrase | DuplicatePhrase | PhraseTooSimilar)` -
    ///   Validation failure, always carrying a reason
    /// * `Err(RoundExpired)` - Past the grace window
    /// * `Err(RoundNotFound)` - Unknown round, wrong owner, or already
    ///   submitted
    pub async fn submit_copy_phrase(
        &self,
        player_id: Uuid,
        round_id: Uuid,
        phrase: &str,
    ) -> Result<String, GameError> {
        // Unlocked read for the validation context.
        let round = self.require_active_round(player_id, round_id).await?;
        let (prompt_round_id, original_phrase) = match &round.kind {
            RoundKind::Copy {
                prompt_round_id,
                original_phrase,
                ..
            } => (*prompt_round_id, original_phrase.clone()),
            _ => return Err(GameError::RoundNotFound),
        };
        if round.is_past_grace(self.clock.now(), self.config.grace_period_seconds) {
            self.handle_timeout(round_id).await?;
            return Err(GameError::RoundExpired);
        }

        let prompt_round = self
            .store
            .round(prompt_round_id)
            .await
            .ok_or_else(|| {
                GameError::StateMachineViolation("copy round references missing prompt".into())
            })?;
        let prompt_text = match &prompt_round.kind {
            RoundKind::Prompt { prompt_text, .. } => prompt_text.clone(),
            _ => {
                return Err(GameError::StateMachineViolation(
                    "copy round references non-prompt round".into(),
                ))
            }
        };
        let other_copy = self
            .store
            .submitted_copies_for_prompt(prompt_round_id)
            .await
            .into_iter()
            .filter(|c| c.round_id != round_id)
            .find_map(|c| match c.kind {
                RoundKind::Copy {
                    submitted_phrase: Some(p),
                    ..
                } => Some(p),
                _ => None,
            });

        // Network call happens here, outside any lock.
        let normalized = self
            .validator
            .validate_copy_phrase(phrase, &original_phrase, other_copy.as_deref(), &prompt_text)
            .await?;

        let _guard = self
            .locks
            .acquire(&LockManager::player_key(player_id))
            .await?;

        // Re-check now that the lock is held.
        let round = self.require_active_round(player_id, round_id).await?;
        if round.is_past_grace(self.clock.now(), self.config.grace_period_seconds) {
            self.timeout_round_locked(&round).await?;
            return Err(GameError::RoundExpired);
        }

        // Serialized per prompt so two second-copy submissions cannot
        // both build a phraseset.
        let _prompt_guard = self
            .locks
            .acquire(&LockManager::prompt_key(prompt_round_id))
            .await?;

        // The other copy may have landed while the embedding call was in
        // flight; the exact-duplicate invariant is re-checked here. The
        // similarity verdicts from above still stand.
        let landed_duplicate = self
            .store
            .submitted_copies_for_prompt(prompt_round_id)
            .await
            .into_iter()
            .filter(|c| c.round_id != round_id)
            .any(|c| {
                matches!(
                    c.kind,
                    RoundKind::Copy { submitted_phrase: Some(ref p), .. } if *p == normalized
                )
            });
        if landed_duplicate {
            return Err(GameError::DuplicatePhrase(
                "cannot submit the same phrase as the other copy".to_string(),
            ));
        }

        self.store
            .modify_round(round_id, |r| {
                r.status = RoundStatus::Submitted;
                if let RoundKind::Copy { submitted_phrase, .. } = &mut r.kind {
                    *submitted_phrase = Some(normalized.clone());
                }
            })
            .await?;
        self.clear_active_round(player_id, round_id).await?;

        self.settle_copies_for_prompt(prompt_round_id, player_id)
            .await?;

        tracing::info!("copy round {} submitted: {}", round_id, normalized);
        Ok(normalized)
    }

    /// After a copy submission: either send the prompt back for its
    /// second copy or materialize the phraseset.
    async fn settle_copies_for_prompt(
        &self,
        prompt_round_id: Uuid,
        submitter: Uuid,
    ) -> Result<(), GameError> {
        let copies = self.store.submitted_copies_for_prompt(prompt_round_id).await;

        if copies.len() < 2 {
            let copy = copies.first().ok_or_else(|| {
                GameError::StateMachineViolation("submitted copy not found".into())
            })?;
            let copy_player = copy.player_id;
            self.store
                .modify_round(prompt_round_id, |r| {
                    if let RoundKind::Prompt {
                        phraseset_status,
                        copy1_player_id,
                        ..
                    } = &mut r.kind
                    {
                        *phraseset_status = PromptProgress::WaitingCopy1;
                        *copy1_player_id = Some(copy_player);
                    }
                })
                .await?;
            // Back into the queue for its second copy.
            if !self.queue.contains_prompt(prompt_round_id).await {
                self.queue.push_prompt(prompt_round_id).await;
            }
            self.activity
                .record(
                    ActivityKind::Copy1Submitted,
                    None,
                    Some(prompt_round_id),
                    Some(submitter),
                )
                .await;
            return Ok(());
        }

        if self
            .store
            .phraseset_for_prompt_round(prompt_round_id)
            .await
            .is_some()
        {
            // Late third copy after a retry race: the submission stands,
            // the already-built phraseset is untouched.
            tracing::warn!(
                "extra copy submitted for prompt {} after phraseset build",
                prompt_round_id
            );
            return Ok(());
        }

        self.build_phraseset(prompt_round_id, &copies[0], &copies[1], submitter)
            .await
    }

    async fn build_phraseset(
        &self,
        prompt_round_id: Uuid,
        copy1: &Round,
        copy2: &Round,
        submitter: Uuid,
    ) -> Result<(), GameError> {
        let prompt_round = self.store.round(prompt_round_id).await.ok_or_else(|| {
            GameError::StateMachineViolation("prompt round missing at phraseset build".into())
        })?;
        let (prompt_text, original_phrase) = match &prompt_round.kind {
            RoundKind::Prompt {
                prompt_text,
                submitted_phrase: Some(phrase),
                ..
            } => (prompt_text.clone(), phrase.clone()),
            _ => {
                return Err(GameError::StateMachineViolation(
                    "prompt round incomplete at phraseset build".into(),
                ))
            }
        };

        let phrase_of = |round: &Round| -> Result<(String, i64), GameError> {
            match &round.kind {
                RoundKind::Copy {
                    submitted_phrase: Some(p),
                    system_contribution,
                    ..
                } => Ok((p.clone(), *system_contribution)),
                _ => Err(GameError::StateMachineViolation(
                    "copy round incomplete at phraseset build".into(),
                )),
            }
        };
        let (copy_phrase_1, contribution1) = phrase_of(copy1)?;
        let (copy_phrase_2, contribution2) = phrase_of(copy2)?;

        let system_contribution = contribution1 + contribution2;
        let phraseset = Phraseset {
            phraseset_id: Uuid::new_v4(),
            prompt_round_id,
            copy_round_1_id: copy1.round_id,
            copy_round_2_id: copy2.round_id,
            prompt_text,
            original_phrase,
            copy_phrase_1,
            copy_phrase_2,
            status: PhrasesetStatus::Open,
            vote_count: 0,
            third_vote_at: None,
            fifth_vote_at: None,
            closes_at: None,
            total_pool: self.config.phraseset_prize_pool + system_contribution,
            system_contribution,
            created_at: self.clock.now(),
            finalized_at: None,
        };

        let copy1_player = copy1.player_id;
        let copy2_player = copy2.player_id;
        self.store
            .modify_round(prompt_round_id, |r| {
                if let RoundKind::Prompt {
                    phraseset_status,
                    copy1_player_id,
                    copy2_player_id,
                    ..
                } = &mut r.kind
                {
                    *phraseset_status = PromptProgress::Active;
                    *copy1_player_id = Some(copy1_player);
                    *copy2_player_id = Some(copy2_player);
                }
            })
            .await?;

        let phraseset_id = phraseset.phraseset_id;
        self.store.insert_phraseset(phraseset).await;
        self.queue.add_phraseset(phraseset_id).await;

        self.activity
            .record(
                ActivityKind::Copy2Submitted,
                Some(phraseset_id),
                Some(prompt_round_id),
                Some(submitter),
            )
            .await;
        self.activity
            .record(
                ActivityKind::PhrasesetCreated,
                Some(phraseset_id),
                Some(prompt_round_id),
                None,
            )
            .await;
        self.activity
            .attach_phraseset(prompt_round_id, phraseset_id)
            .await;

        tracing::info!(
            "created phraseset {} from prompt {}",
            phraseset_id,
            prompt_round_id
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Timeouts
    // ------------------------------------------------------------------

    /// Expires a round that ran past its grace window. Safe to call from
    /// the sweeper and from lazy read paths concurrently; a round that is
    /// no longer active is left alone.
    ///
    /// # Arguments
    /// * `round_id` - The round to examine; not required to exist
    ///
    /// # Returns
    /// * `Ok(())` - Whether or not anything had to be settled
    /// * `Err(LockTimeout)` - Could not win the owner's lock in time
    pub async fn handle_timeout(&self, round_id: Uuid) -> Result<(), GameError> {
        let Some(round) = self.store.round(round_id).await else {
            return Ok(());
        };
        if round.status != RoundStatus::Active
            || !round.is_past_grace(self.clock.now(), self.config.grace_period_seconds)
        {
            return Ok(());
        }

        let _guard = self
            .locks
            .acquire(&LockManager::player_key(round.player_id))
            .await?;

        // Re-read: another path may have settled it while we waited.
        let Some(round) = self.store.round(round_id).await else {
            return Ok(());
        };
        if round.status != RoundStatus::Active {
            return Ok(());
        }
        self.timeout_round_locked(&round).await
    }

    /// Timeout body; the caller holds the player lock.
    async fn timeout_round_locked(&self, round: &Round) -> Result<(), GameError> {
        match &round.kind {
            RoundKind::Prompt { .. } => {
                self.store
                    .modify_round(round.round_id, |r| {
                        r.status = RoundStatus::Expired;
                        if let RoundKind::Prompt { phraseset_status, .. } = &mut r.kind {
                            *phraseset_status = PromptProgress::Abandoned;
                        }
                    })
                    .await?;
                let refund = self.config.refund_for(round.cost);
                self.ledger
                    .apply(
                        round.player_id,
                        refund,
                        TransactionKind::Refund,
                        Some(round.round_id),
                        true,
                    )
                    .await?;
                self.queue.remove_prompt(round.round_id).await;
                tracing::info!("prompt round {} expired, refunded {}", round.round_id, refund);
            }
            RoundKind::Copy { prompt_round_id, .. } => {
                let prompt_round_id = *prompt_round_id;
                self.store
                    .modify_round(round.round_id, |r| r.status = RoundStatus::Abandoned)
                    .await?;
                let refund = self.config.refund_for(round.cost);
                self.ledger
                    .apply(
                        round.player_id,
                        refund,
                        TransactionKind::Refund,
                        Some(round.round_id),
                        true,
                    )
                    .await?;

                // Return the leased prompt unless it already completed.
                let still_needed = self
                    .store
                    .phraseset_for_prompt_round(prompt_round_id)
                    .await
                    .is_none();
                if still_needed && !self.queue.contains_prompt(prompt_round_id).await {
                    self.queue.push_prompt(prompt_round_id).await;
                }

                self.store
                    .insert_abandonment(AbandonedPrompt {
                        id: Uuid::new_v4(),
                        player_id: round.player_id,
                        prompt_round_id,
                        abandoned_at: self.clock.now(),
                    })
                    .await;
                tracing::info!(
                    "copy round {} abandoned, refunded {}, prompt {} requeued",
                    round.round_id,
                    refund,
                    prompt_round_id,
                );
            }
            RoundKind::Vote { .. } => {
                // The vote dollar is forfeited.
                self.store
                    .modify_round(round.round_id, |r| r.status = RoundStatus::Expired)
                    .await?;
                tracing::info!("vote round {} expired", round.round_id);
            }
        }

        self.clear_active_round(round.player_id, round.round_id).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The player's active round, settling it first if it timed out
    /// (lazy arm of the timer contract).
    ///
    /// # Returns
    /// * `Ok(Some(Round))` - A live active round
    /// * `Ok(None)` - No active round, or it just expired and was
    ///   settled by this read
    /// * `Err(PlayerNotFound)` - Unknown player id
    pub async fn current_round(&self, player_id: Uuid) -> Result<Option<Round>, GameError> {
        let player = self
            .store
            .player(player_id)
            .await
            .ok_or(GameError::PlayerNotFound)?;
        let Some(round_id) = player.active_round_id else {
            return Ok(None);
        };
        let Some(round) = self.store.round(round_id).await else {
            self.clear_active_round(player_id, round_id).await?;
            return Ok(None);
        };

        if round.status != RoundStatus::Active {
            self.clear_active_round(player_id, round_id).await?;
            return Ok(None);
        }
        if round.is_past_grace(self.clock.now(), self.config.grace_period_seconds) {
            self.handle_timeout(round_id).await?;
            return Ok(None);
        }
        Ok(Some(round))
    }

    /// Round detail restricted to its owner.
    pub async fn round_for_player(
        &self,
        player_id: Uuid,
        round_id: Uuid,
    ) -> Result<Round, GameError> {
        let round = self
            .store
            .round(round_id)
            .await
            .ok_or(GameError::RoundNotFound)?;
        if round.player_id != player_id {
            return Err(GameError::RoundNotFound);
        }
        Ok(round)
    }

    /// Queue entries this player could actually draw.
    pub async fn available_prompt_count(&self, player_id: Uuid) -> usize {
        let cutoff = self.clock.now() - Duration::hours(self.config.abandonment_cooldown_hours);
        let mut count = 0;
        for candidate_id in self.queue.prompt_snapshot().await {
            let Some(candidate) = self.store.round(candidate_id).await else {
                continue;
            };
            if candidate.player_id == player_id {
                continue;
            }
            if self
                .store
                .has_recent_abandonment(player_id, candidate_id, cutoff)
                .await
            {
                continue;
            }
            if self
                .store
                .player_has_copy_for_prompt(player_id, candidate_id)
                .await
            {
                continue;
            }
            count += 1;
        }
        count
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Player exists and has no live active round. Settles a timed-out
    /// active round on the way.
    async fn require_idle_player(
        &self,
        player_id: Uuid,
    ) -> Result<crate::models::Player, GameError> {
        let player = self
            .store
            .player(player_id)
            .await
            .ok_or(GameError::PlayerNotFound)?;

        if let Some(active_id) = player.active_round_id {
            if let Some(active) = self.store.round(active_id).await {
                if active.status == RoundStatus::Active
                    && active.is_past_grace(self.clock.now(), self.config.grace_period_seconds)
                {
                    self.timeout_round_locked(&active).await?;
                } else if active.status == RoundStatus::Active {
                    return Err(GameError::AlreadyInRound);
                } else {
                    self.clear_active_round(player_id, active_id).await?;
                }
            } else {
                self.clear_active_round(player_id, active_id).await?;
            }
            return self
                .store
                .player(player_id)
                .await
                .ok_or(GameError::PlayerNotFound);
        }
        Ok(player)
    }

    async fn require_active_round(
        &self,
        player_id: Uuid,
        round_id: Uuid,
    ) -> Result<Round, GameError> {
        let round = self
            .store
            .round(round_id)
            .await
            .ok_or(GameError::RoundNotFound)?;
        if round.player_id != player_id {
            return Err(GameError::RoundNotFound);
        }
        match round.status {
            RoundStatus::Active => Ok(round),
            RoundStatus::Expired | RoundStatus::Abandoned => Err(GameError::RoundExpired),
            RoundStatus::Submitted => Err(GameError::RoundNotFound),
        }
    }

    async fn clear_active_round(&self, player_id: Uuid, round_id: Uuid) -> Result<(), GameError> {
        self.store
            .modify_player(player_id, |p| {
                if p.active_round_id == Some(round_id) {
                    p.active_round_id = None;
                }
            })
            .await?;
        Ok(())
    }
}
