//! # Phraseset Views & Claims
//!
//! Player-facing read shapes over phrasesets - the paginated
//! contribution list, the dashboard summary, unclaimed results, pending
//! results, the full detail view - plus the idempotent prize claim.
//!
//! Prize money moves at finalization; the claim here only flips the
//! acknowledgement flag on the player's result view, so claiming twice
//! can never pay twice.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::GameError;
use crate::models::{
    Activity, ActivityKind, Phraseset, PhrasesetStatus, PromptProgress, ResultView, Round,
    RoundKind, RoundStatus, Vote,
};
use crate::services::activity::ActivityService;
use crate::services::scoring::{PayoutBreakdown, ScoringService};
use crate::store::GameStore;
use crate::utils::{Clock, LockManager};

/// The role a player had in a phraseset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributorRole {
    Prompt,
    Copy,
}

/// Role filter for the contribution list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleFilter {
    #[default]
    All,
    Prompt,
    Copy,
}

impl RoleFilter {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "prompt" => RoleFilter::Prompt,
            "copy" => RoleFilter::Copy,
            _ => RoleFilter::All,
        }
    }

    fn matches(&self, role: ContributorRole) -> bool {
        match self {
            RoleFilter::All => true,
            RoleFilter::Prompt => role == ContributorRole::Prompt,
            RoleFilter::Copy => role == ContributorRole::Copy,
        }
    }
}

/// Status-bucket filter for the contribution list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    InProgress,
    Voting,
    Finalized,
    Abandoned,
}

impl StatusFilter {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "in_progress" => StatusFilter::InProgress,
            "voting" => StatusFilter::Voting,
            "finalized" => StatusFilter::Finalized,
            "abandoned" => StatusFilter::Abandoned,
            _ => StatusFilter::All,
        }
    }

    fn matches(&self, status: &str) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::InProgress => matches!(
                status,
                "waiting_copies" | "waiting_copy1" | "voting" | "closing"
            ),
            StatusFilter::Voting => matches!(status, "voting" | "closing"),
            StatusFilter::Finalized => status == "finalized",
            StatusFilter::Abandoned => status == "abandoned",
        }
    }
}

/// One row in the player's contribution list.
#[derive(Debug, Clone, Serialize)]
pub struct ContributionEntry {
    pub phraseset_id: Option<Uuid>,
    pub prompt_round_id: Uuid,
    pub prompt_text: String,
    pub your_role: ContributorRole,
    pub your_phrase: Option<String>,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub vote_count: u32,
    pub third_vote_at: Option<DateTime<Utc>>,
    pub fifth_vote_at: Option<DateTime<Utc>>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub has_copy1: bool,
    pub has_copy2: bool,
    pub your_payout: Option<i64>,
    pub payout_claimed: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryBucket {
    pub prompts: usize,
    pub copies: usize,
    pub unclaimed_prompts: usize,
    pub unclaimed_copies: usize,
}

/// Dashboard rollup of a player's phrasesets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSummary {
    pub in_progress: SummaryBucket,
    pub finalized: SummaryBucket,
    pub total_unclaimed_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnclaimedEntry {
    pub phraseset_id: Uuid,
    pub prompt_text: String,
    pub your_role: ContributorRole,
    pub your_phrase: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub your_payout: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnclaimedResults {
    pub unclaimed: Vec<UnclaimedEntry>,
    pub total_unclaimed_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingResult {
    pub phraseset_id: Uuid,
    pub prompt_text: String,
    pub completed_at: DateTime<Utc>,
    pub role: ContributorRole,
    pub payout_claimed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhraseVoteCount {
    pub phrase: String,
    pub vote_count: u32,
    pub is_original: bool,
}

/// The results bundle a contributor sees after finalization.
#[derive(Debug, Clone, Serialize)]
pub struct PhrasesetResults {
    pub phraseset_id: Uuid,
    pub prompt_text: String,
    pub votes: Vec<PhraseVoteCount>,
    pub your_phrase: String,
    pub your_role: ContributorRole,
    pub your_points: i64,
    pub your_payout: i64,
    pub total_pool: i64,
    pub total_votes: u32,
    pub payout_claimed: bool,
    pub finalized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContributorView {
    pub player_id: Uuid,
    pub phrase: String,
    pub role: ContributorRole,
    pub is_you: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteView {
    pub vote_id: Uuid,
    pub voter_id: Uuid,
    pub voted_phrase: String,
    pub correct: bool,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsSection {
    pub vote_counts: Vec<PhraseVoteCount>,
    pub payouts: PayoutBreakdown,
    pub total_pool: i64,
}

/// Full detail view for a contributor.
#[derive(Debug, Clone, Serialize)]
pub struct PhrasesetDetail {
    pub phraseset_id: Uuid,
    pub prompt_round_id: Uuid,
    pub prompt_text: String,
    pub status: &'static str,
    pub original_phrase: String,
    pub copy_phrase_1: String,
    pub copy_phrase_2: String,
    pub contributors: Vec<ContributorView>,
    pub vote_count: u32,
    pub third_vote_at: Option<DateTime<Utc>>,
    pub fifth_vote_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub votes: Vec<VoteView>,
    pub total_pool: i64,
    pub results: Option<ResultsSection>,
    pub your_role: ContributorRole,
    pub your_phrase: Option<String>,
    pub your_payout: Option<i64>,
    pub payout_claimed: bool,
    pub activity: Vec<Activity>,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

/// Outcome of a claim call.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    pub success: bool,
    pub amount: i64,
    pub new_balance: i64,
    pub already_claimed: bool,
}

pub struct PhrasesetService {
    store: Arc<GameStore>,
    clock: Clock,
    locks: Arc<LockManager>,
    scoring: Arc<ScoringService>,
    activity: Arc<ActivityService>,
}

impl PhrasesetService {
    pub fn new(
        store: Arc<GameStore>,
        clock: Clock,
        locks: Arc<LockManager>,
        scoring: Arc<ScoringService>,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self {
            store,
            clock,
            locks,
            scoring,
            activity,
        }
    }

    // ------------------------------------------------------------------
    // List, summary, unclaimed
    // ------------------------------------------------------------------

    /// Paginated contribution list, filtered by role and status bucket.
    ///
    /// # Arguments
    /// * `player_id` - Whose contributions to list
    /// * `role` - Restrict to prompt work, copy work, or both
    /// * `status` - Status bucket (in progress, voting, finalized,
    ///   abandoned) or everything
    /// * `limit` / `offset` - Page window over the filtered rows
    ///
    /// # Returns
    /// * `Ok((page, total))` - One page of entries, newest first, plus
    ///   the total matching count for pagination
    pub async fn list_for_player(
        &self,
        player_id: Uuid,
        role: RoleFilter,
        status: StatusFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ContributionEntry>, usize), GameError> {
        let contributions = self.build_contributions(player_id).await?;
        let filtered: Vec<ContributionEntry> = contributions
            .into_iter()
            .filter(|entry| role.matches(entry.your_role) && status.matches(entry.status))
            .collect();
        let total = filtered.len();
        let page = filtered.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    /// Dashboard counts and unclaimed totals.
    pub async fn summary_for_player(&self, player_id: Uuid) -> Result<DashboardSummary, GameError> {
        let contributions = self.build_contributions(player_id).await?;
        let mut summary = DashboardSummary::default();

        for entry in contributions {
            let finalized = entry.status == "finalized";
            let bucket = if finalized {
                &mut summary.finalized
            } else {
                &mut summary.in_progress
            };
            match entry.your_role {
                ContributorRole::Prompt => bucket.prompts += 1,
                ContributorRole::Copy => bucket.copies += 1,
            }

            let unclaimed_amount = match (finalized, entry.payout_claimed, entry.your_payout) {
                (true, false, Some(amount)) if amount > 0 => amount,
                _ => continue,
            };
            match entry.your_role {
                ContributorRole::Prompt => summary.finalized.unclaimed_prompts += 1,
                ContributorRole::Copy => summary.finalized.unclaimed_copies += 1,
            }
            summary.total_unclaimed_amount += unclaimed_amount;
        }
        Ok(summary)
    }

    /// Finalized phrasesets the player has not acknowledged yet.
    pub async fn unclaimed_for_player(&self, player_id: Uuid) -> Result<UnclaimedResults, GameError> {
        let contributions = self.build_contributions(player_id).await?;
        let mut unclaimed = Vec::new();
        let mut total = 0i64;

        for entry in contributions {
            if entry.status != "finalized" || entry.payout_claimed {
                continue;
            }
            let (Some(phraseset_id), Some(payout)) = (entry.phraseset_id, entry.your_payout) else {
                continue;
            };
            total += payout;
            unclaimed.push(UnclaimedEntry {
                phraseset_id,
                prompt_text: entry.prompt_text,
                your_role: entry.your_role,
                your_phrase: entry.your_phrase,
                finalized_at: entry.finalized_at,
                your_payout: payout,
            });
        }

        unclaimed.sort_by(|a, b| b.finalized_at.cmp(&a.finalized_at));
        Ok(UnclaimedResults {
            unclaimed,
            total_unclaimed_amount: total,
        })
    }

    /// Finalized phrasesets for the results inbox, newest first.
    pub async fn pending_results(&self, player_id: Uuid) -> Result<Vec<PendingResult>, GameError> {
        let contributions = self.build_contributions(player_id).await?;
        let mut pending: Vec<PendingResult> = contributions
            .into_iter()
            .filter(|e| e.status == "finalized")
            .filter_map(|e| {
                Some(PendingResult {
                    phraseset_id: e.phraseset_id?,
                    prompt_text: e.prompt_text,
                    completed_at: e.finalized_at?,
                    role: e.your_role,
                    payout_claimed: e.payout_claimed,
                })
            })
            .collect();
        pending.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(pending)
    }

    // ------------------------------------------------------------------
    // Results, detail, claim
    // ------------------------------------------------------------------

    /// Results bundle for a contributor. Records the first view on the
    /// player's result view row.
    ///
    /// # Arguments
    /// * `player_id` - Must be one of the three contributors
    /// * `phraseset_id` - The finalized phraseset
    ///
    /// # Returns
    /// * `Ok(PhrasesetResults)` - Vote tallies, the player's role,
    ///   points, payout, and claim state
    /// * `Err(NotFinalized)` - Voting has not closed yet
    /// * `Err(NotContributor)` - The player has no stake in this set
    /// * `Err(PhrasesetNotFound)` - Unknown id
    pub async fn results_for_player(
        &self,
        player_id: Uuid,
        phraseset_id: Uuid,
    ) -> Result<PhrasesetResults, GameError> {
        let phraseset = self
            .store
            .phraseset(phraseset_id)
            .await
            .ok_or(GameError::PhrasesetNotFound)?;
        if phraseset.status != PhrasesetStatus::Finalized {
            return Err(GameError::NotFinalized);
        }

        let (role, your_phrase, breakdown) =
            self.contributor_context(&phraseset, player_id).await?;
        let view = self
            .ensure_result_view(&phraseset, player_id, &breakdown)
            .await?;

        let votes = self.store.votes_for_phraseset(phraseset_id).await;
        let vote_counts = self.count_votes(&phraseset, &votes);
        let your_points = breakdown
            .for_player(player_id)
            .map(|share| share.points)
            .unwrap_or(0);

        Ok(PhrasesetResults {
            phraseset_id,
            prompt_text: phraseset.prompt_text.clone(),
            votes: vote_counts,
            your_phrase: your_phrase.unwrap_or_default(),
            your_role: role,
            your_points,
            your_payout: view.payout_amount,
            total_pool: phraseset.total_pool,
            total_votes: phraseset.vote_count,
            payout_claimed: view.payout_claimed,
            finalized_at: phraseset.finalized_at,
        })
    }

    /// Full timeline view for a contributor; works before finalization.
    pub async fn detail_for_player(
        &self,
        player_id: Uuid,
        phraseset_id: Uuid,
    ) -> Result<PhrasesetDetail, GameError> {
        let phraseset = self
            .store
            .phraseset(phraseset_id)
            .await
            .ok_or(GameError::PhrasesetNotFound)?;

        let (prompt_player, copy1_player, copy2_player) =
            self.store.contributor_players(&phraseset).await?;
        let contributors = [
            (prompt_player, &phraseset.original_phrase, ContributorRole::Prompt),
            (copy1_player, &phraseset.copy_phrase_1, ContributorRole::Copy),
            (copy2_player, &phraseset.copy_phrase_2, ContributorRole::Copy),
        ];
        if !contributors.iter().any(|(id, _, _)| *id == player_id) {
            return Err(GameError::NotContributor);
        }

        let contributor_views = contributors
            .iter()
            .map(|(id, phrase, role)| ContributorView {
                player_id: *id,
                phrase: (*phrase).clone(),
                role: *role,
                is_you: *id == player_id,
            })
            .collect();

        let (your_role, your_phrase) = identify_role(
            player_id,
            &phraseset,
            prompt_player,
            copy1_player,
            copy2_player,
        );

        let votes = self.store.votes_for_phraseset(phraseset_id).await;
        let vote_views = votes
            .iter()
            .map(|v| VoteView {
                vote_id: v.vote_id,
                voter_id: v.player_id,
                voted_phrase: v.voted_phrase.clone(),
                correct: v.correct,
                voted_at: v.created_at,
            })
            .collect();

        let (results, your_payout, payout_claimed) =
            if phraseset.status == PhrasesetStatus::Finalized {
                let breakdown = self.scoring.calculate(
                    &phraseset,
                    &votes,
                    prompt_player,
                    copy1_player,
                    copy2_player,
                );
                let view = self.store.result_view(player_id, phraseset_id).await;
                let payout = view
                    .as_ref()
                    .map(|v| v.payout_amount)
                    .or_else(|| breakdown.for_player(player_id).map(|s| s.payout));
                let claimed = view.map(|v| v.payout_claimed).unwrap_or(false);
                let section = ResultsSection {
                    vote_counts: self.count_votes(&phraseset, &votes),
                    total_pool: phraseset.total_pool,
                    payouts: breakdown,
                };
                (Some(section), payout, claimed)
            } else {
                (None, None, false)
            };

        let prompt_round = self.store.round(phraseset.prompt_round_id).await;
        Ok(PhrasesetDetail {
            phraseset_id,
            prompt_round_id: phraseset.prompt_round_id,
            prompt_text: phraseset.prompt_text.clone(),
            status: derive_status(prompt_round.as_ref(), Some(&phraseset)),
            original_phrase: phraseset.original_phrase.clone(),
            copy_phrase_1: phraseset.copy_phrase_1.clone(),
            copy_phrase_2: phraseset.copy_phrase_2.clone(),
            contributors: contributor_views,
            vote_count: phraseset.vote_count,
            third_vote_at: phraseset.third_vote_at,
            fifth_vote_at: phraseset.fifth_vote_at,
            closes_at: phraseset.closes_at,
            votes: vote_views,
            total_pool: phraseset.total_pool,
            results,
            your_role,
            your_phrase,
            your_payout,
            payout_claimed,
            activity: self.activity.timeline(phraseset_id).await,
            created_at: phraseset.created_at,
            finalized_at: phraseset.finalized_at,
        })
    }

    /// Idempotent claim. The first call flips the flag; every later call
    /// reports `already_claimed` and changes nothing. The prize money
    /// itself moved at finalization, so no balance changes here.
    ///
    /// # Arguments
    /// * `player_id` - Must be one of the three contributors
    /// * `phraseset_id` - The finalized phraseset being acknowledged
    ///
    /// # Returns
    /// * `Ok(ClaimOutcome)` - The payout amount, the current balance,
    ///   and whether this call was the first claim
    /// * `Err(NotFinalized | NotContributor | PhrasesetNotFound)`
    ///
    /// # Example
    /// ```rust,ignore
    /// let first = phrasesets.claim_prize(player_id, phraseset_id).await?;
    /// let again = phrasesets.claim_prize(player_id, phraseset_id).await?;
    /// assert!(again.already_claimed);
    /// assert_eq!(first.amount, again.amount);
    /// ```
    pub async fn claim_prize(
        &self,
        player_id: Uuid,
        phraseset_id: Uuid,
    ) -> Result<ClaimOutcome, GameError> {
        let _guard = self
            .locks
            .acquire(&LockManager::player_key(player_id))
            .await?;

        let phraseset = self
            .store
            .phraseset(phraseset_id)
            .await
            .ok_or(GameError::PhrasesetNotFound)?;
        if phraseset.status != PhrasesetStatus::Finalized {
            return Err(GameError::NotFinalized);
        }

        let (_, _, breakdown) = self.contributor_context(&phraseset, player_id).await?;
        let view = self
            .ensure_result_view(&phraseset, player_id, &breakdown)
            .await?;

        let already_claimed = view.payout_claimed;
        if !already_claimed {
            let now = self.clock.now();
            let mut updated = view.clone();
            updated.payout_claimed = true;
            updated.payout_claimed_at = Some(now);
            if updated.first_viewed_at.is_none() {
                updated.first_viewed_at = Some(now);
            }
            self.store.upsert_result_view(updated).await;
            self.activity
                .record(
                    ActivityKind::PrizeClaimed,
                    Some(phraseset_id),
                    None,
                    Some(player_id),
                )
                .await;
            tracing::info!(
                "player {} claimed {} from phraseset {}",
                player_id,
                view.payout_amount,
                phraseset_id,
            );
        }

        let player = self
            .store
            .player(player_id)
            .await
            .ok_or(GameError::PlayerNotFound)?;
        Ok(ClaimOutcome {
            success: true,
            amount: view.payout_amount,
            new_balance: player.balance,
            already_claimed,
        })
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Role, phrase, and payout breakdown for a contributor; fails with
    /// `NotContributor` for everyone else.
    async fn contributor_context(
        &self,
        phraseset: &Phraseset,
        player_id: Uuid,
    ) -> Result<(ContributorRole, Option<String>, PayoutBreakdown), GameError> {
        let (prompt_player, copy1_player, copy2_player) =
            self.store.contributor_players(phraseset).await?;
        if player_id != prompt_player && player_id != copy1_player && player_id != copy2_player {
            return Err(GameError::NotContributor);
        }
        let (role, phrase) = identify_role(
            player_id,
            phraseset,
            prompt_player,
            copy1_player,
            copy2_player,
        );
        let votes = self.store.votes_for_phraseset(phraseset.phraseset_id).await;
        let breakdown = self.scoring.calculate(
            phraseset,
            &votes,
            prompt_player,
            copy1_player,
            copy2_player,
        );
        Ok((role, phrase, breakdown))
    }

    /// Loads or creates the player's result view with the computed
    /// payout amount.
    async fn ensure_result_view(
        &self,
        phraseset: &Phraseset,
        player_id: Uuid,
        breakdown: &PayoutBreakdown,
    ) -> Result<ResultView, GameError> {
        if let Some(view) = self
            .store
            .result_view(player_id, phraseset.phraseset_id)
            .await
        {
            return Ok(view);
        }
        let payout_amount = breakdown
            .for_player(player_id)
            .map(|share| share.payout)
            .unwrap_or(0);
        let view = ResultView {
            view_id: Uuid::new_v4(),
            phraseset_id: phraseset.phraseset_id,
            player_id,
            first_viewed_at: Some(self.clock.now()),
            payout_amount,
            payout_claimed: false,
            payout_claimed_at: None,
        };
        self.store.upsert_result_view(view.clone()).await;
        Ok(view)
    }

    fn count_votes(&self, phraseset: &Phraseset, votes: &[Vote]) -> Vec<PhraseVoteCount> {
        phraseset
            .phrases()
            .iter()
            .map(|phrase| PhraseVoteCount {
                phrase: phrase.to_string(),
                vote_count: votes.iter().filter(|v| v.voted_phrase == *phrase).count() as u32,
                is_original: *phrase == phraseset.original_phrase,
            })
            .collect()
    }

    /// Joins the player's prompt and copy rounds against phrasesets and
    /// result views into display rows, newest first.
    async fn build_contributions(
        &self,
        player_id: Uuid,
    ) -> Result<Vec<ContributionEntry>, GameError> {
        let rounds = self.store.rounds_for_player(player_id).await;

        let prompt_rounds: Vec<&Round> = rounds
            .iter()
            .filter(|r| {
                matches!(
                    &r.kind,
                    RoundKind::Prompt {
                        submitted_phrase: Some(_),
                        ..
                    }
                )
            })
            .collect();
        let copy_rounds: Vec<&Round> = rounds
            .iter()
            .filter(|r| {
                r.status == RoundStatus::Submitted && matches!(r.kind, RoundKind::Copy { .. })
            })
            .collect();

        // Prompt rounds referenced by this player's work.
        let mut prompt_round_ids: std::collections::HashSet<Uuid> =
            prompt_rounds.iter().map(|r| r.round_id).collect();
        for copy in &copy_rounds {
            if let RoundKind::Copy { prompt_round_id, .. } = &copy.kind {
                prompt_round_ids.insert(*prompt_round_id);
            }
        }
        if prompt_round_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut prompt_round_map: HashMap<Uuid, Round> = HashMap::new();
        for round in &prompt_rounds {
            prompt_round_map.insert(round.round_id, (*round).clone());
        }
        for id in &prompt_round_ids {
            if !prompt_round_map.contains_key(id) {
                if let Some(round) = self.store.round(*id).await {
                    prompt_round_map.insert(*id, round);
                }
            }
        }

        let phrasesets = self
            .store
            .phrasesets_by_prompt_rounds(&prompt_round_ids)
            .await;
        let phraseset_map: HashMap<Uuid, Phraseset> = phrasesets
            .into_iter()
            .map(|ps| (ps.prompt_round_id, ps))
            .collect();

        let result_views: HashMap<Uuid, ResultView> = self
            .store
            .result_views_for_player(player_id)
            .await
            .into_iter()
            .map(|v| (v.phraseset_id, v))
            .collect();

        let mut breakdown_cache: HashMap<Uuid, PayoutBreakdown> = HashMap::new();
        let mut entries = Vec::new();

        for round in prompt_rounds {
            let phraseset = phraseset_map.get(&round.round_id);
            entries.push(
                self.entry_for(
                    player_id,
                    ContributorRole::Prompt,
                    round,
                    Some(round),
                    phraseset,
                    &result_views,
                    &mut breakdown_cache,
                )
                .await?,
            );
        }
        for round in copy_rounds {
            let RoundKind::Copy { prompt_round_id, .. } = &round.kind else {
                continue;
            };
            let prompt_round = prompt_round_map.get(prompt_round_id);
            let phraseset = phraseset_map.get(prompt_round_id);
            entries.push(
                self.entry_for(
                    player_id,
                    ContributorRole::Copy,
                    round,
                    prompt_round,
                    phraseset,
                    &result_views,
                    &mut breakdown_cache,
                )
                .await?,
            );
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    #[allow(clippy::too_many_arguments)]
    async fn entry_for(
        &self,
        player_id: Uuid,
        role: ContributorRole,
        own_round: &Round,
        prompt_round: Option<&Round>,
        phraseset: Option<&Phraseset>,
        result_views: &HashMap<Uuid, ResultView>,
        breakdown_cache: &mut HashMap<Uuid, PayoutBreakdown>,
    ) -> Result<ContributionEntry, GameError> {
        let view = phraseset.and_then(|ps| result_views.get(&ps.phraseset_id));
        let payout_claimed = view.map(|v| v.payout_claimed).unwrap_or(false);

        let mut your_payout = None;
        if let Some(ps) = phraseset {
            if ps.status == PhrasesetStatus::Finalized {
                if !breakdown_cache.contains_key(&ps.phraseset_id) {
                    let (prompt_player, copy1_player, copy2_player) =
                        self.store.contributor_players(ps).await?;
                    let votes = self.store.votes_for_phraseset(ps.phraseset_id).await;
                    breakdown_cache.insert(
                        ps.phraseset_id,
                        self.scoring.calculate(
                            ps,
                            &votes,
                            prompt_player,
                            copy1_player,
                            copy2_player,
                        ),
                    );
                }
                your_payout = breakdown_cache
                    .get(&ps.phraseset_id)
                    .and_then(|b| b.for_player(player_id))
                    .map(|share| share.payout);
                if let Some(v) = view {
                    your_payout = Some(v.payout_amount);
                }
            }
        }

        let your_phrase = match &own_round.kind {
            RoundKind::Prompt { submitted_phrase, .. } => submitted_phrase.clone(),
            RoundKind::Copy { submitted_phrase, .. } => submitted_phrase.clone(),
            RoundKind::Vote { .. } => None,
        };
        let (has_copy1, has_copy2) = match prompt_round.map(|r| &r.kind) {
            Some(RoundKind::Prompt {
                copy1_player_id,
                copy2_player_id,
                ..
            }) => (copy1_player_id.is_some(), copy2_player_id.is_some()),
            _ => (phraseset.is_some(), phraseset.is_some()),
        };

        let prompt_text = phraseset
            .map(|ps| ps.prompt_text.clone())
            .or_else(|| match prompt_round.map(|r| &r.kind) {
                Some(RoundKind::Prompt { prompt_text, .. }) => Some(prompt_text.clone()),
                _ => None,
            })
            .unwrap_or_default();

        let updated_at = phraseset
            .and_then(|ps| ps.finalized_at.or(ps.closes_at).or(Some(ps.created_at)))
            .or_else(|| prompt_round.map(|r| r.created_at))
            .or(Some(own_round.created_at));

        Ok(ContributionEntry {
            phraseset_id: phraseset.map(|ps| ps.phraseset_id),
            prompt_round_id: prompt_round.map(|r| r.round_id).unwrap_or(own_round.round_id),
            prompt_text,
            your_role: role,
            your_phrase,
            status: derive_status(prompt_round, phraseset),
            created_at: own_round.created_at,
            updated_at,
            vote_count: phraseset.map(|ps| ps.vote_count).unwrap_or(0),
            third_vote_at: phraseset.and_then(|ps| ps.third_vote_at),
            fifth_vote_at: phraseset.and_then(|ps| ps.fifth_vote_at),
            finalized_at: phraseset.and_then(|ps| ps.finalized_at),
            has_copy1,
            has_copy2,
            your_payout,
            payout_claimed,
        })
    }
}

/// Display status across the prompt-round and phraseset state machines.
fn derive_status(prompt_round: Option<&Round>, phraseset: Option<&Phraseset>) -> &'static str {
    if let Some(ps) = phraseset {
        return match ps.status {
            PhrasesetStatus::Open => "voting",
            PhrasesetStatus::Closing | PhrasesetStatus::Closed => "closing",
            PhrasesetStatus::Finalized => "finalized",
        };
    }
    if let Some(round) = prompt_round {
        if let RoundKind::Prompt { phraseset_status, .. } = &round.kind {
            return match phraseset_status {
                PromptProgress::WaitingCopies => "waiting_copies",
                PromptProgress::WaitingCopy1 => "waiting_copy1",
                PromptProgress::Active => "voting",
                PromptProgress::Finalized => "finalized",
                PromptProgress::Abandoned => "abandoned",
            };
        }
    }
    "waiting_copies"
}

fn identify_role(
    player_id: Uuid,
    phraseset: &Phraseset,
    prompt_player: Uuid,
    copy1_player: Uuid,
    copy2_player: Uuid,
) -> (ContributorRole, Option<String>) {
    if player_id == prompt_player {
        (
            ContributorRole::Prompt,
            Some(phraseset.original_phrase.clone()),
        )
    } else if player_id == copy1_player {
        (ContributorRole::Copy, Some(phraseset.copy_phrase_1.clone()))
    } else if player_id == copy2_player {
        (ContributorRole::Copy, Some(phraseset.copy_phrase_2.clone()))
    } else {
        (ContributorRole::Copy, None)
    }
}
