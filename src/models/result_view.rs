//! Per-(player, phraseset) record of viewing and claiming a result.
//!
//! The prize transaction is written at finalization; the claim flag here
//! is the idempotent acknowledgement, never a second disbursement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultView {
    pub view_id: Uuid,
    pub phraseset_id: Uuid,
    pub player_id: Uuid,
    pub first_viewed_at: Option<DateTime<Utc>>,
    /// The contributor's share, computed at finalization.
    pub payout_amount: i64,
    pub payout_claimed: bool,
    pub payout_claimed_at: Option<DateTime<Utc>>,
}
