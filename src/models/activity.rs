//! Append-only activity timeline for a phraseset. Entries recorded
//! before the phraseset exists (prompt submission, first copy) carry the
//! prompt round id and are attached retroactively once the set is built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PromptCreated,
    Copy1Submitted,
    Copy2Submitted,
    PhrasesetCreated,
    VoteCast,
    Finalized,
    PrizeClaimed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub activity_id: Uuid,
    pub phraseset_id: Option<Uuid>,
    pub prompt_round_id: Option<Uuid>,
    pub kind: ActivityKind,
    pub player_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
