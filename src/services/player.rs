//! # Player Service
//!
//! The trusted-peer adapter around player accounts: creation with the
//! starting balance, the balance/status view, the daily bonus, and the
//! precondition checks every round start runs first.
//!
//! Identity (usernames, credentials, sessions) lives in an external
//! plane; here a player is an id, a balance, and a little calendar
//! state.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::GameConfig;
use crate::error::GameError;
use crate::models::{DailyBonus, Player, TransactionKind};
use crate::services::ledger::TransactionService;
use crate::store::GameStore;
use crate::utils::{Clock, LockManager};

/// Balance and status summary for the dashboard.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BalanceView {
    pub player_id: Uuid,
    pub balance: i64,
    pub starting_balance: i64,
    pub daily_bonus_available: bool,
    pub daily_bonus_amount: i64,
    pub last_login_date: Option<chrono::NaiveDate>,
    pub outstanding_prompts: usize,
}

pub struct PlayerService {
    config: Arc<GameConfig>,
    store: Arc<GameStore>,
    clock: Clock,
    locks: Arc<LockManager>,
    ledger: Arc<TransactionService>,
}

impl PlayerService {
    pub fn new(
        config: Arc<GameConfig>,
        store: Arc<GameStore>,
        clock: Clock,
        locks: Arc<LockManager>,
        ledger: Arc<TransactionService>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
            locks,
            ledger,
        }
    }

    /// Creates a player with the configured starting balance. No bonus
    /// on the creation day.
    ///
    /// # Returns
    /// The stored player record, with a fresh id and no active round.
    pub async fn create_player(&self) -> Player {
        let player = Player::new(
            Uuid::new_v4(),
            self.config.starting_balance,
            self.clock.now(),
        );
        self.store.insert_player(player.clone()).await;
        tracing::info!(
            "created player {} with balance {}",
            player.player_id,
            player.balance
        );
        player
    }

    pub async fn get_player(&self, player_id: Uuid) -> Result<Player, GameError> {
        self.store
            .player(player_id)
            .await
            .ok_or(GameError::PlayerNotFound)
    }

    /// Balance and status summary for the dashboard.
    ///
    /// # Arguments
    /// * `player_id` - The account to summarize
    ///
    /// # Returns
    /// * `Ok(BalanceView)` - Balance, bonus availability, and the
    ///   outstanding-prompt count
    /// * `Err(PlayerNotFound)` - Unknown player id
    pub async fn balance(&self, player_id: Uuid) -> Result<BalanceView, GameError> {
        let player = self.get_player(player_id).await?;
        let outstanding = self.store.outstanding_prompt_count(player_id).await;
        Ok(BalanceView {
            player_id,
            balance: player.balance,
            starting_balance: self.config.starting_balance,
            daily_bonus_available: self.daily_bonus_available(&player),
            daily_bonus_amount: self.config.daily_bonus_amount,
            last_login_date: player.last_login_date,
            outstanding_prompts: outstanding,
        })
    }

    /// Bonus rules: never on the creation day, at most once per calendar
    /// day after that.
    pub fn daily_bonus_available(&self, player: &Player) -> bool {
        let today = self.clock.today();
        if player.created_at.date_naive() == today {
            return false;
        }
        match player.last_login_date {
            None => true,
            Some(last) => last < today,
        }
    }

    /// Claims the daily bonus.
    ///
    /// # Arguments
    /// * `player_id` - The claiming player
    ///
    /// # Returns
    /// * `Ok((amount, new_balance))` - The credited bonus and the
    ///   balance after it landed
    /// * `Err(DailyBonusNotAvailable)` - Created today, or already
    ///   claimed today
    pub async fn claim_daily_bonus(&self, player_id: Uuid) -> Result<(i64, i64), GameError> {
        let _guard = self
            .locks
            .acquire(&LockManager::player_key(player_id))
            .await?;

        let player = self.get_player(player_id).await?;
        if !self.daily_bonus_available(&player) {
            return Err(GameError::DailyBonusNotAvailable);
        }

        let today = self.clock.today();
        let bonus = DailyBonus {
            bonus_id: Uuid::new_v4(),
            player_id,
            amount: self.config.daily_bonus_amount,
            date: today,
            created_at: self.clock.now(),
        };
        self.store.insert_daily_bonus(bonus.clone()).await;
        self.store
            .modify_player(player_id, |p| p.last_login_date = Some(today))
            .await?;

        let transaction = self
            .ledger
            .apply(
                player_id,
                self.config.daily_bonus_amount,
                TransactionKind::DailyBonus,
                Some(bonus.bonus_id),
                true,
            )
            .await?;

        tracing::info!("player {} claimed daily bonus {}", player_id, bonus.amount);
        Ok((bonus.amount, transaction.balance_after))
    }

    // ------------------------------------------------------------------
    // Round-start preconditions
    // ------------------------------------------------------------------

    pub async fn can_start_prompt_round(&self, player: &Player) -> Result<(), GameError> {
        if player.balance < self.config.prompt_cost {
            return Err(GameError::InsufficientBalance);
        }
        if player.active_round_id.is_some() {
            return Err(GameError::AlreadyInRound);
        }
        let outstanding = self.store.outstanding_prompt_count(player.player_id).await;
        if outstanding >= self.config.max_outstanding_prompts {
            return Err(GameError::MaxOutstandingPrompts);
        }
        Ok(())
    }

    pub fn can_start_copy_round(
        &self,
        player: &Player,
        copy_cost: i64,
        prompts_available: usize,
    ) -> Result<(), GameError> {
        if player.balance < copy_cost {
            return Err(GameError::InsufficientBalance);
        }
        if player.active_round_id.is_some() {
            return Err(GameError::AlreadyInRound);
        }
        if prompts_available == 0 {
            return Err(GameError::NoPromptsAvailable);
        }
        Ok(())
    }

    pub fn can_start_vote_round(
        &self,
        player: &Player,
        phrasesets_available: usize,
    ) -> Result<(), GameError> {
        if player.balance < self.config.vote_cost {
            return Err(GameError::InsufficientBalance);
        }
        if player.active_round_id.is_some() {
            return Err(GameError::AlreadyInRound);
        }
        if phrasesets_available == 0 {
            return Err(GameError::NoPhrasesetsAvailable);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service() -> (Arc<GameStore>, Clock, PlayerService) {
        let config = Arc::new(GameConfig::default());
        let store = Arc::new(GameStore::new());
        let clock = Clock::new();
        let locks = Arc::new(LockManager::new(Duration::from_secs(1)));
        let ledger = Arc::new(TransactionService::new(
            store.clone(),
            locks.clone(),
            clock.clone(),
        ));
        let players = PlayerService::new(config, store.clone(), clock.clone(), locks, ledger);
        (store, clock, players)
    }

    #[tokio::test]
    async fn new_players_start_with_configured_balance() {
        let (_store, _clock, players) = service();
        let player = players.create_player().await;
        assert_eq!(player.balance, 1000);
        assert!(player.active_round_id.is_none());
    }

    #[tokio::test]
    async fn no_bonus_on_creation_day() {
        let (_store, _clock, players) = service();
        let player = players.create_player().await;
        assert!(!players.daily_bonus_available(&player));
        let err = players.claim_daily_bonus(player.player_id).await.unwrap_err();
        assert!(matches!(err, GameError::DailyBonusNotAvailable));
    }

    #[tokio::test]
    async fn bonus_claimable_once_per_day() {
        let (store, clock, players) = service();
        let player = players.create_player().await;
        clock.advance(chrono::Duration::days(1));

        let (amount, new_balance) = players.claim_daily_bonus(player.player_id).await.unwrap();
        assert_eq!(amount, 100);
        assert_eq!(new_balance, 1100);
        assert_eq!(store.player(player.player_id).await.unwrap().balance, 1100);

        let err = players.claim_daily_bonus(player.player_id).await.unwrap_err();
        assert!(matches!(err, GameError::DailyBonusNotAvailable));

        clock.advance(chrono::Duration::days(1));
        assert!(players.claim_daily_bonus(player.player_id).await.is_ok());
    }
}
