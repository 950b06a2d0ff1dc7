//! # Ledger
//!
//! The only path that moves money. Every charge, refund, bonus, and
//! payout goes through `apply`, which serializes on the per-player
//! advisory lock, checks the non-negative balance invariant, and writes
//! the balance update and journal entry as one atomic store commit.
//!
//! Callers already inside a per-player critical section pass
//! `skip_lock = true` instead of re-acquiring (the lock is not
//! reentrant).

use std::sync::Arc;

use uuid::Uuid;

use crate::error::GameError;
use crate::models::{Transaction, TransactionKind};
use crate::store::GameStore;
use crate::utils::{Clock, LockManager};

pub struct TransactionService {
    store: Arc<GameStore>,
    locks: Arc<LockManager>,
    clock: Clock,
}

impl TransactionService {
    pub fn new(store: Arc<GameStore>, locks: Arc<LockManager>, clock: Clock) -> Self {
        Self {
            store,
            locks,
            clock,
        }
    }

    /// Applies a signed amount to the player's balance and journals it.
    ///
    /// # Arguments
    /// * `player_id` - The account to move
    /// * `amount` - Negative for charges, positive for payouts
    /// * `kind` - Journal category for the entry
    /// * `reference_id` - Round, vote, phraseset, or bonus the entry
    ///   refers to
    /// * `skip_lock` - True when the caller already holds the player
    ///   lock; the lock is not reentrant
    ///
    /// # Returns
    /// * `Ok(Transaction)` - The journal entry, with `balance_after`
    ///   snapshotting the new balance
    /// * `Err(InsufficientBalance)` - The balance would go negative;
    ///   nothing was written
    /// * `Err(PlayerNotFound)` - Unknown player id
    ///
    /// # Example
    /// ```rust,ignore
    /// ledger
    ///     .apply(player_id, -100, TransactionKind::PromptEntry, Some(round_id), true)
    ///     .await?;
    /// ```
    pub async fn apply(
        &self,
        player_id: Uuid,
        amount: i64,
        kind: TransactionKind,
        reference_id: Option<Uuid>,
        skip_lock: bool,
    ) -> Result<Transaction, GameError> {
        let _guard = if skip_lock {
            None
        } else {
            Some(
                self.locks
                    .acquire(&LockManager::player_key(player_id))
                    .await?,
            )
        };

        let transaction = self
            .store
            .apply_transaction(player_id, amount, kind, reference_id, self.clock.now())
            .await?;

        tracing::info!(
            "transaction: player={}, amount={}, kind={:?}, new_balance={}",
            player_id,
            amount,
            kind,
            transaction.balance_after,
        );
        Ok(transaction)
    }

    /// Player journal, newest first.
    pub async fn history(
        &self,
        player_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Vec<Transaction> {
        self.store
            .transactions_for_player(player_id, limit, offset)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Player;
    use chrono::Utc;
    use std::time::Duration;

    fn service() -> (Arc<GameStore>, TransactionService) {
        let store = Arc::new(GameStore::new());
        let locks = Arc::new(LockManager::new(Duration::from_secs(1)));
        let ledger = TransactionService::new(store.clone(), locks, Clock::new());
        (store, ledger)
    }

    #[tokio::test]
    async fn charges_and_payouts_keep_journal_consistent() {
        let (store, ledger) = service();
        let player = Player::new(Uuid::new_v4(), 1000, Utc::now());
        let id = player.player_id;
        store.insert_player(player).await;

        ledger
            .apply(id, -100, TransactionKind::PromptEntry, None, false)
            .await
            .unwrap();
        ledger
            .apply(id, 90, TransactionKind::Refund, None, false)
            .await
            .unwrap();

        let balance = store.player(id).await.unwrap().balance;
        assert_eq!(balance, 990);
        assert_eq!(store.journal_sum_for_player(id).await, balance - 1000);

        let history = ledger.history(id, 10, 0).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].balance_after, 990);
    }

    #[tokio::test]
    async fn overdraft_is_rejected_without_journal_entry() {
        let (store, ledger) = service();
        let player = Player::new(Uuid::new_v4(), 50, Utc::now());
        let id = player.player_id;
        store.insert_player(player).await;

        let err = ledger
            .apply(id, -51, TransactionKind::VoteEntry, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientBalance));
        assert!(ledger.history(id, 10, 0).await.is_empty());
    }

    #[tokio::test]
    async fn skip_lock_works_inside_an_existing_critical_section() {
        let (store, ledger) = service();
        let player = Player::new(Uuid::new_v4(), 10, Utc::now());
        let id = player.player_id;
        store.insert_player(player).await;

        let locks = Arc::new(LockManager::new(Duration::from_millis(50)));
        let guard = locks.acquire(&LockManager::player_key(id)).await.unwrap();
        // Holding the same logical lock, a skip_lock apply must not deadlock.
        let tx = ledger
            .apply(id, -1, TransactionKind::VoteEntry, None, true)
            .await
            .unwrap();
        assert_eq!(tx.balance_after, 9);
        drop(guard);
    }

    #[tokio::test]
    async fn unknown_player_is_rejected() {
        let (_store, ledger) = service();
        let err = ledger
            .apply(Uuid::new_v4(), 5, TransactionKind::DailyBonus, None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::PlayerNotFound));
    }
}
