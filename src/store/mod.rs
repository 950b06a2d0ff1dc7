//! # Game Store
//!
//! The transactional store the engine runs against. Persistence is a
//! swappable collaborator; this in-process realization keeps each table
//! behind a `tokio::sync::RwLock` and hands out clones, the same
//! single-process fallback used when no shared broker is configured.
//! Services serialize their own critical sections with the advisory
//! `LockManager`; the store only guarantees that each method is
//! individually atomic.
//!
//! The one multi-row commit the ledger depends on lives here:
//! `apply_transaction` updates a player balance and appends the journal
//! entry under both write locks, so no journal row is ever observable
//! without its balance update.
//!
//! Lock ordering, where a method needs two tables: players before
//! transactions, rounds before phrasesets.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::GameError;
use crate::models::{
    AbandonedPrompt, Activity, DailyBonus, Phraseset, PhrasesetStatus, Player, Prompt, ResultView,
    Round, RoundKind, RoundStatus, Transaction, TransactionKind, Vote,
};

#[derive(Default)]
pub struct GameStore {
    players: RwLock<HashMap<Uuid, Player>>,
    prompts: RwLock<HashMap<Uuid, Prompt>>,
    rounds: RwLock<HashMap<Uuid, Round>>,
    phrasesets: RwLock<HashMap<Uuid, Phraseset>>,
    votes: RwLock<Vec<Vote>>,
    transactions: RwLock<Vec<Transaction>>,
    result_views: RwLock<HashMap<(Uuid, Uuid), ResultView>>,
    daily_bonuses: RwLock<Vec<DailyBonus>>,
    abandonments: RwLock<Vec<AbandonedPrompt>>,
    activities: RwLock<Vec<Activity>>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    pub async fn insert_player(&self, player: Player) {
        self.players.write().await.insert(player.player_id, player);
    }

    pub async fn player(&self, player_id: Uuid) -> Option<Player> {
        self.players.read().await.get(&player_id).cloned()
    }

    /// Applies `f` to the player under the write lock and returns the
    /// updated copy.
    pub async fn modify_player<F>(&self, player_id: Uuid, f: F) -> Result<Player, GameError>
    where
        F: FnOnce(&mut Player),
    {
        let mut players = self.players.write().await;
        let player = players.get_mut(&player_id).ok_or(GameError::PlayerNotFound)?;
        f(player);
        Ok(player.clone())
    }

    /// Atomically moves a player's balance and appends the journal entry.
    ///
    /// Fails with `InsufficientBalance` (and writes nothing) when the new
    /// balance would go negative.
    pub async fn apply_transaction(
        &self,
        player_id: Uuid,
        amount: i64,
        kind: TransactionKind,
        reference_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Transaction, GameError> {
        let mut players = self.players.write().await;
        let mut transactions = self.transactions.write().await;

        let player = players.get_mut(&player_id).ok_or(GameError::PlayerNotFound)?;
        let new_balance = player.balance + amount;
        if new_balance < 0 {
            return Err(GameError::InsufficientBalance);
        }

        player.balance = new_balance;
        let transaction = Transaction {
            transaction_id: Uuid::new_v4(),
            player_id,
            amount,
            kind,
            reference_id,
            balance_after: new_balance,
            created_at: now,
        };
        transactions.push(transaction.clone());
        Ok(transaction)
    }

    // ------------------------------------------------------------------
    // Prompt library
    // ------------------------------------------------------------------

    pub async fn seed_prompts(&self, prompts: Vec<Prompt>) {
        let mut table = self.prompts.write().await;
        for prompt in prompts {
            table.insert(prompt.prompt_id, prompt);
        }
    }

    pub async fn enabled_prompts(&self) -> Vec<Prompt> {
        self.prompts
            .read()
            .await
            .values()
            .filter(|p| p.enabled)
            .cloned()
            .collect()
    }

    pub async fn increment_prompt_usage(&self, prompt_id: Uuid) {
        if let Some(prompt) = self.prompts.write().await.get_mut(&prompt_id) {
            prompt.usage_count += 1;
        }
    }

    // ------------------------------------------------------------------
    // Rounds
    // ------------------------------------------------------------------

    pub async fn insert_round(&self, round: Round) {
        self.rounds.write().await.insert(round.round_id, round);
    }

    pub async fn round(&self, round_id: Uuid) -> Option<Round> {
        self.rounds.read().await.get(&round_id).cloned()
    }

    pub async fn modify_round<F>(&self, round_id: Uuid, f: F) -> Result<Round, GameError>
    where
        F: FnOnce(&mut Round),
    {
        let mut rounds = self.rounds.write().await;
        let round = rounds.get_mut(&round_id).ok_or(GameError::RoundNotFound)?;
        f(round);
        Ok(round.clone())
    }

    pub async fn rounds_for_player(&self, player_id: Uuid) -> Vec<Round> {
        let mut rounds: Vec<Round> = self
            .rounds
            .read()
            .await
            .values()
            .filter(|r| r.player_id == player_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|r| r.created_at);
        rounds
    }

    /// Submitted copy rounds for a prompt, oldest first.
    pub async fn submitted_copies_for_prompt(&self, prompt_round_id: Uuid) -> Vec<Round> {
        let mut copies: Vec<Round> = self
            .rounds
            .read()
            .await
            .values()
            .filter(|r| {
                r.status == RoundStatus::Submitted
                    && matches!(
                        r.kind,
                        RoundKind::Copy { prompt_round_id: id, .. } if id == prompt_round_id
                    )
            })
            .cloned()
            .collect();
        copies.sort_by_key(|r| r.created_at);
        copies
    }

    /// True when the player has any copy round (active or submitted)
    /// drawn against the given prompt.
    pub async fn player_has_copy_for_prompt(
        &self,
        player_id: Uuid,
        prompt_round_id: Uuid,
    ) -> bool {
        self.rounds.read().await.values().any(|r| {
            r.player_id == player_id
                && matches!(r.status, RoundStatus::Active | RoundStatus::Submitted)
                && matches!(
                    r.kind,
                    RoundKind::Copy { prompt_round_id: id, .. } if id == prompt_round_id
                )
        })
    }

    /// All currently active rounds; the timer sweep scans these.
    pub async fn active_rounds(&self) -> Vec<Round> {
        self.rounds
            .read()
            .await
            .values()
            .filter(|r| r.status == RoundStatus::Active)
            .cloned()
            .collect()
    }

    /// Number of open-or-closing phrasesets fed by the player's prompt
    /// rounds. This is the "outstanding prompts" bound.
    pub async fn outstanding_prompt_count(&self, player_id: Uuid) -> usize {
        let prompt_round_ids: HashSet<Uuid> = self
            .rounds
            .read()
            .await
            .values()
            .filter(|r| {
                r.player_id == player_id
                    && r.status == RoundStatus::Submitted
                    && matches!(r.kind, RoundKind::Prompt { .. })
            })
            .map(|r| r.round_id)
            .collect();

        if prompt_round_ids.is_empty() {
            return 0;
        }

        self.phrasesets
            .read()
            .await
            .values()
            .filter(|ps| {
                prompt_round_ids.contains(&ps.prompt_round_id)
                    && matches!(ps.status, PhrasesetStatus::Open | PhrasesetStatus::Closing)
            })
            .count()
    }

    // ------------------------------------------------------------------
    // Phrasesets
    // ------------------------------------------------------------------

    pub async fn insert_phraseset(&self, phraseset: Phraseset) {
        self.phrasesets
            .write()
            .await
            .insert(phraseset.phraseset_id, phraseset);
    }

    pub async fn phraseset(&self, phraseset_id: Uuid) -> Option<Phraseset> {
        self.phrasesets.read().await.get(&phraseset_id).cloned()
    }

    pub async fn modify_phraseset<F>(
        &self,
        phraseset_id: Uuid,
        f: F,
    ) -> Result<Phraseset, GameError>
    where
        F: FnOnce(&mut Phraseset),
    {
        let mut phrasesets = self.phrasesets.write().await;
        let phraseset = phrasesets
            .get_mut(&phraseset_id)
            .ok_or(GameError::PhrasesetNotFound)?;
        f(phraseset);
        Ok(phraseset.clone())
    }

    pub async fn phraseset_for_prompt_round(&self, prompt_round_id: Uuid) -> Option<Phraseset> {
        self.phrasesets
            .read()
            .await
            .values()
            .find(|ps| ps.prompt_round_id == prompt_round_id)
            .cloned()
    }

    pub async fn phrasesets_accepting_votes(&self) -> Vec<Phraseset> {
        self.phrasesets
            .read()
            .await
            .values()
            .filter(|ps| ps.accepts_votes())
            .cloned()
            .collect()
    }

    /// Player ids behind (prompt, copy1, copy2) of a phraseset.
    pub async fn contributor_players(
        &self,
        phraseset: &Phraseset,
    ) -> Result<(Uuid, Uuid, Uuid), GameError> {
        let rounds = self.rounds.read().await;
        let owner = |round_id: Uuid| -> Result<Uuid, GameError> {
            rounds
                .get(&round_id)
                .map(|r| r.player_id)
                .ok_or_else(|| {
                    GameError::StateMachineViolation(format!(
                        "phraseset {} references missing round {}",
                        phraseset.phraseset_id, round_id
                    ))
                })
        };
        Ok((
            owner(phraseset.prompt_round_id)?,
            owner(phraseset.copy_round_1_id)?,
            owner(phraseset.copy_round_2_id)?,
        ))
    }

    pub async fn phrasesets_by_prompt_rounds(&self, ids: &HashSet<Uuid>) -> Vec<Phraseset> {
        self.phrasesets
            .read()
            .await
            .values()
            .filter(|ps| ids.contains(&ps.prompt_round_id))
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Votes
    // ------------------------------------------------------------------

    pub async fn insert_vote(&self, vote: Vote) {
        self.votes.write().await.push(vote);
    }

    pub async fn votes_for_phraseset(&self, phraseset_id: Uuid) -> Vec<Vote> {
        let mut votes: Vec<Vote> = self
            .votes
            .read()
            .await
            .iter()
            .filter(|v| v.phraseset_id == phraseset_id)
            .cloned()
            .collect();
        votes.sort_by_key(|v| v.created_at);
        votes
    }

    pub async fn has_vote(&self, player_id: Uuid, phraseset_id: Uuid) -> bool {
        self.votes
            .read()
            .await
            .iter()
            .any(|v| v.player_id == player_id && v.phraseset_id == phraseset_id)
    }

    pub async fn voted_phraseset_ids(&self, player_id: Uuid) -> HashSet<Uuid> {
        self.votes
            .read()
            .await
            .iter()
            .filter(|v| v.player_id == player_id)
            .map(|v| v.phraseset_id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Journal
    // ------------------------------------------------------------------

    /// Player history, newest first.
    pub async fn transactions_for_player(
        &self,
        player_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Vec<Transaction> {
        let mut entries: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.player_id == player_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.into_iter().skip(offset).take(limit).collect()
    }

    /// Journal entries of one kind referencing a specific id.
    pub async fn transactions_by_reference(
        &self,
        kind: TransactionKind,
        reference_id: Uuid,
    ) -> Vec<Transaction> {
        self.transactions
            .read()
            .await
            .iter()
            .filter(|t| t.kind == kind && t.reference_id == Some(reference_id))
            .cloned()
            .collect()
    }

    /// Signed sum of every journal entry for the player.
    pub async fn journal_sum_for_player(&self, player_id: Uuid) -> i64 {
        self.transactions
            .read()
            .await
            .iter()
            .filter(|t| t.player_id == player_id)
            .map(|t| t.amount)
            .sum()
    }

    // ------------------------------------------------------------------
    // Result views
    // ------------------------------------------------------------------

    pub async fn result_view(&self, player_id: Uuid, phraseset_id: Uuid) -> Option<ResultView> {
        self.result_views
            .read()
            .await
            .get(&(player_id, phraseset_id))
            .cloned()
    }

    pub async fn upsert_result_view(&self, view: ResultView) {
        self.result_views
            .write()
            .await
            .insert((view.player_id, view.phraseset_id), view);
    }

    pub async fn result_views_for_player(&self, player_id: Uuid) -> Vec<ResultView> {
        self.result_views
            .read()
            .await
            .values()
            .filter(|v| v.player_id == player_id)
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Daily bonuses
    // ------------------------------------------------------------------

    pub async fn insert_daily_bonus(&self, bonus: DailyBonus) {
        self.daily_bonuses.write().await.push(bonus);
    }

    // ------------------------------------------------------------------
    // Abandonment records
    // ------------------------------------------------------------------

    pub async fn insert_abandonment(&self, record: AbandonedPrompt) {
        self.abandonments.write().await.push(record);
    }

    /// True when the player abandoned this prompt after `cutoff`.
    pub async fn has_recent_abandonment(
        &self,
        player_id: Uuid,
        prompt_round_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> bool {
        self.abandonments.read().await.iter().any(|a| {
            a.player_id == player_id
                && a.prompt_round_id == prompt_round_id
                && a.abandoned_at > cutoff
        })
    }

    // ------------------------------------------------------------------
    // Activity timeline
    // ------------------------------------------------------------------

    pub async fn record_activity(&self, activity: Activity) {
        self.activities.write().await.push(activity);
    }

    /// Attaches a freshly built phraseset to earlier prompt-level entries.
    pub async fn attach_activity_phraseset(&self, prompt_round_id: Uuid, phraseset_id: Uuid) {
        let mut activities = self.activities.write().await;
        for activity in activities.iter_mut() {
            if activity.prompt_round_id == Some(prompt_round_id) && activity.phraseset_id.is_none()
            {
                activity.phraseset_id = Some(phraseset_id);
            }
        }
    }

    pub async fn activities_for_phraseset(&self, phraseset_id: Uuid) -> Vec<Activity> {
        let mut entries: Vec<Activity> = self
            .activities
            .read()
            .await
            .iter()
            .filter(|a| a.phraseset_id == Some(phraseset_id))
            .cloned()
            .collect();
        entries.sort_by_key(|a| a.created_at);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(balance: i64) -> Player {
        Player::new(Uuid::new_v4(), balance, Utc::now())
    }

    #[tokio::test]
    async fn apply_transaction_updates_balance_and_journal_together() {
        let store = GameStore::new();
        let p = player(100);
        let id = p.player_id;
        store.insert_player(p).await;

        let tx = store
            .apply_transaction(id, -60, TransactionKind::PromptEntry, None, Utc::now())
            .await
            .unwrap();
        assert_eq!(tx.balance_after, 40);
        assert_eq!(store.player(id).await.unwrap().balance, 40);
        assert_eq!(store.journal_sum_for_player(id).await, -60);
    }

    #[tokio::test]
    async fn apply_transaction_rejects_overdraft_without_side_effects() {
        let store = GameStore::new();
        let p = player(50);
        let id = p.player_id;
        store.insert_player(p).await;

        let err = store
            .apply_transaction(id, -100, TransactionKind::CopyEntry, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientBalance));
        assert_eq!(store.player(id).await.unwrap().balance, 50);
        assert_eq!(store.journal_sum_for_player(id).await, 0);
    }

    #[tokio::test]
    async fn attach_activity_backfills_prompt_entries() {
        let store = GameStore::new();
        let prompt_round_id = Uuid::new_v4();
        let phraseset_id = Uuid::new_v4();
        store
            .record_activity(Activity {
                activity_id: Uuid::new_v4(),
                phraseset_id: None,
                prompt_round_id: Some(prompt_round_id),
                kind: crate::models::ActivityKind::PromptCreated,
                player_id: None,
                created_at: Utc::now(),
            })
            .await;

        store
            .attach_activity_phraseset(prompt_round_id, phraseset_id)
            .await;
        let entries = store.activities_for_phraseset(phraseset_id).await;
        assert_eq!(entries.len(), 1);
    }
}
