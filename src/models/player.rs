//! Player account state.
//!
//! Identity itself is created by an external plane; the engine owns the
//! balance, the daily-bonus eligibility date, and the at-most-one active
//! round pointer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub player_id: Uuid,
    /// Whole game dollars; never negative.
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    /// Last calendar day the player logged in or claimed the bonus.
    pub last_login_date: Option<NaiveDate>,
    /// The player's single active round, if any.
    pub active_round_id: Option<Uuid>,
}

impl Player {
    pub fn new(player_id: Uuid, balance: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            player_id,
            balance,
            created_at,
            last_login_date: Some(created_at.date_naive()),
            active_round_id: None,
        }
    }
}
