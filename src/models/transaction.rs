//! # Transaction Journal
//!
//! Append-only record of every balance mutation. Each entry snapshots
//! the balance after application, so the journal alone can reconstruct
//! any player's balance; the ledger service enforces that no entry is
//! ever written without the matching balance update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    PromptEntry,
    CopyEntry,
    VoteEntry,
    VotePayout,
    PrizePayout,
    Refund,
    DailyBonus,
    SystemContribution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub player_id: Uuid,
    /// Negative for charges, positive for payouts.
    pub amount: i64,
    pub kind: TransactionKind,
    /// Round, vote, phraseset, or bonus the entry refers to.
    pub reference_id: Option<Uuid>,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}
