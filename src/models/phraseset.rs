//! # Phrasesets
//!
//! The artifact voters adjudicate: one prompt, the original phrase, and
//! two copies. Created when the second submitted copy arrives; finalized
//! at most once; never deleted. Nobody owns it - three rounds reference
//! it weakly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhrasesetStatus {
    /// Accepting votes.
    Open,
    /// Fifth vote seen; the 60-second closing window is running.
    Closing,
    /// Closing window elapsed; awaiting finalization.
    Closed,
    /// Payouts computed and locked.
    Finalized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phraseset {
    pub phraseset_id: Uuid,
    pub prompt_round_id: Uuid,
    pub copy_round_1_id: Uuid,
    pub copy_round_2_id: Uuid,

    pub prompt_text: String,
    pub original_phrase: String,
    pub copy_phrase_1: String,
    pub copy_phrase_2: String,

    pub status: PhrasesetStatus,
    pub vote_count: u32,
    pub third_vote_at: Option<DateTime<Utc>>,
    pub fifth_vote_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,

    /// Base pool plus system contributions from discounted copies.
    pub total_pool: i64,
    pub system_contribution: i64,

    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Phraseset {
    /// The three phrases in storage order (original first).
    pub fn phrases(&self) -> [&str; 3] {
        [
            &self.original_phrase,
            &self.copy_phrase_1,
            &self.copy_phrase_2,
        ]
    }

    /// True while the set still accepts votes.
    pub fn accepts_votes(&self) -> bool {
        matches!(self.status, PhrasesetStatus::Open | PhrasesetStatus::Closing)
    }
}
