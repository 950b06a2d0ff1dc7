//! A single vote. Unique per (voter, phraseset); the correct flag and
//! payout are fixed at submission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub vote_id: Uuid,
    pub phraseset_id: Uuid,
    pub player_id: Uuid,
    pub voted_phrase: String,
    pub correct: bool,
    /// 5 for a correct vote, 0 otherwise.
    pub payout: i64,
    pub created_at: DateTime<Utc>,
}
