//! # Queue Service
//!
//! Two pieces of process-wide coordination state: the FIFO of prompt
//! rounds waiting for copy players, and the pool of phrasesets open for
//! voting. Both sit behind a mutex and support atomic pop/removal; a
//! distributed deployment would back them with a shared broker instead,
//! which is why specific-item removal stays advisory and dequeue-side
//! re-checks defend against stale entries.
//!
//! The copy discount hangs off the prompt queue: once more than the
//! threshold of prompts are waiting, new copy rounds cost less and the
//! shortfall is booked as a system contribution to the eventual prize
//! pool.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::GameConfig;

pub struct QueueService {
    config: Arc<GameConfig>,
    prompt_queue: Mutex<VecDeque<Uuid>>,
    voting_pool: Mutex<HashSet<Uuid>>,
}

impl QueueService {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            config,
            prompt_queue: Mutex::new(VecDeque::new()),
            voting_pool: Mutex::new(HashSet::new()),
        }
    }

    // ------------------------------------------------------------------
    // Prompt queue
    // ------------------------------------------------------------------

    /// Appends a prompt round awaiting copies.
    pub async fn push_prompt(&self, prompt_round_id: Uuid) {
        self.prompt_queue.lock().await.push_back(prompt_round_id);
        tracing::info!("prompt queued: {}", prompt_round_id);
    }

    /// Atomically removes and returns the oldest waiting prompt.
    pub async fn pop_prompt(&self) -> Option<Uuid> {
        self.prompt_queue.lock().await.pop_front()
    }

    /// Puts skipped prompts back at the head, preserving their relative
    /// order, so another player's pop sees them first again.
    pub async fn requeue_front(&self, prompt_round_ids: Vec<Uuid>) {
        let mut queue = self.prompt_queue.lock().await;
        for id in prompt_round_ids.into_iter().rev() {
            queue.push_front(id);
        }
    }

    /// Best-effort removal of a specific prompt (abandonment unwind).
    pub async fn remove_prompt(&self, prompt_round_id: Uuid) -> bool {
        let mut queue = self.prompt_queue.lock().await;
        if let Some(pos) = queue.iter().position(|id| *id == prompt_round_id) {
            queue.remove(pos);
            tracing::info!("prompt removed from queue: {}", prompt_round_id);
            true
        } else {
            false
        }
    }

    pub async fn prompts_waiting(&self) -> usize {
        self.prompt_queue.lock().await.len()
    }

    /// Copy of the queue contents, head first. Used for per-player
    /// availability filtering without disturbing the queue.
    pub async fn prompt_snapshot(&self) -> Vec<Uuid> {
        self.prompt_queue.lock().await.iter().copied().collect()
    }

    pub async fn contains_prompt(&self, prompt_round_id: Uuid) -> bool {
        self.prompt_queue
            .lock()
            .await
            .iter()
            .any(|id| *id == prompt_round_id)
    }

    /// Discount predicate, evaluated at copy-round creation.
    pub async fn copy_discount_active(&self) -> bool {
        let waiting = self.prompts_waiting().await;
        let active = waiting > self.config.copy_discount_threshold;
        if active {
            tracing::debug!("copy discount active: {} prompts waiting", waiting);
        }
        active
    }

    /// Current copy entry fee under the discount rule.
    ///
    /// # Returns
    /// `copy_cost_discount` while the queue is over the threshold,
    /// `copy_cost_normal` otherwise.
    pub async fn copy_cost(&self) -> i64 {
        if self.copy_discount_active().await {
            self.config.copy_cost_discount
        } else {
            self.config.copy_cost_normal
        }
    }

    // ------------------------------------------------------------------
    // Voting pool
    // ------------------------------------------------------------------

    pub async fn add_phraseset(&self, phraseset_id: Uuid) {
        self.voting_pool.lock().await.insert(phraseset_id);
        tracing::info!("phraseset open for voting: {}", phraseset_id);
    }

    pub async fn remove_phraseset(&self, phraseset_id: Uuid) {
        self.voting_pool.lock().await.remove(&phraseset_id);
    }

    pub async fn phrasesets_waiting(&self) -> usize {
        self.voting_pool.lock().await.len()
    }

    pub async fn has_phrasesets(&self) -> bool {
        !self.voting_pool.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> QueueService {
        QueueService::new(Arc::new(GameConfig::default()))
    }

    #[tokio::test]
    async fn prompt_queue_is_fifo() {
        let q = queue();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        q.push_prompt(a).await;
        q.push_prompt(b).await;
        q.push_prompt(c).await;

        assert_eq!(q.pop_prompt().await, Some(a));
        assert_eq!(q.pop_prompt().await, Some(b));
        assert_eq!(q.pop_prompt().await, Some(c));
        assert_eq!(q.pop_prompt().await, None);
    }

    #[tokio::test]
    async fn requeue_front_preserves_order() {
        let q = queue();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        q.push_prompt(c).await;
        q.requeue_front(vec![a, b]).await;

        assert_eq!(q.pop_prompt().await, Some(a));
        assert_eq!(q.pop_prompt().await, Some(b));
        assert_eq!(q.pop_prompt().await, Some(c));
    }

    #[tokio::test]
    async fn remove_specific_prompt_is_best_effort() {
        let q = queue();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        q.push_prompt(a).await;
        q.push_prompt(b).await;

        assert!(q.remove_prompt(a).await);
        assert!(!q.remove_prompt(a).await);
        assert_eq!(q.prompts_waiting().await, 1);
    }

    #[tokio::test]
    async fn discount_activates_above_threshold() {
        let q = queue();
        for _ in 0..10 {
            q.push_prompt(Uuid::new_v4()).await;
        }
        assert!(!q.copy_discount_active().await);
        assert_eq!(q.copy_cost().await, 100);

        q.push_prompt(Uuid::new_v4()).await;
        assert!(q.copy_discount_active().await);
        assert_eq!(q.copy_cost().await, 90);
    }

    #[tokio::test]
    async fn voting_pool_tracks_membership() {
        let q = queue();
        let id = Uuid::new_v4();
        assert!(!q.has_phrasesets().await);
        q.add_phraseset(id).await;
        assert_eq!(q.phrasesets_waiting().await, 1);
        q.remove_phraseset(id).await;
        assert!(!q.has_phrasesets().await);
    }
}
