//! Daily-bonus claim record; one per player per calendar day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBonus {
    pub bonus_id: Uuid,
    pub player_id: Uuid,
    pub amount: i64,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}
