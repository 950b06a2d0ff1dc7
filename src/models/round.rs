//! # Rounds
//!
//! A round is one fixed-duration interaction: writing a phrase for a
//! prompt, copying someone else's phrase, or voting on a completed
//! phraseset. The original store kept all three in one wide row with
//! nullable columns per type; in memory the variant data lives in a
//! tagged sum so a copy round simply has no prompt-library field to
//! forget to null out.
//!
//! Back-references are weak: a copy round carries its prompt round's id,
//! a vote round carries its phraseset's id, and resolution goes through
//! the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Active,
    Submitted,
    Expired,
    Abandoned,
}

/// Progress of the phraseset a prompt round is feeding, tracked on the
/// prompt round itself so list views work before a phraseset row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptProgress {
    WaitingCopies,
    WaitingCopy1,
    Active,
    Finalized,
    Abandoned,
}

/// Variant payload per round type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "round_type", rename_all = "snake_case")]
pub enum RoundKind {
    Prompt {
        prompt_id: Uuid,
        /// Denormalized so the round survives library edits.
        prompt_text: String,
        submitted_phrase: Option<String>,
        phraseset_status: PromptProgress,
        copy1_player_id: Option<Uuid>,
        copy2_player_id: Option<Uuid>,
    },
    Copy {
        prompt_round_id: Uuid,
        /// The phrase being imitated, denormalized from the prompt round.
        original_phrase: String,
        submitted_phrase: Option<String>,
        /// 0 normally, 10 when the queue discount paid part of the entry.
        system_contribution: i64,
    },
    Vote {
        phraseset_id: Uuid,
        submitted_at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub round_id: Uuid,
    pub player_id: Uuid,
    pub status: RoundStatus,
    /// Entry fee debited at creation.
    pub cost: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: RoundKind,
}

impl Round {
    /// True once `now` is past expiry plus the grace window.
    pub fn is_past_grace(&self, now: DateTime<Utc>, grace_seconds: i64) -> bool {
        now > self.expires_at + chrono::Duration::seconds(grace_seconds)
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            RoundKind::Prompt { .. } => "prompt",
            RoundKind::Copy { .. } => "copy",
            RoundKind::Vote { .. } => "vote",
        }
    }
}

/// Cooldown record: a player who abandoned a copy round may not redraw
/// the same prompt for 24 hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbandonedPrompt {
    pub id: Uuid,
    pub player_id: Uuid,
    pub prompt_round_id: Uuid,
    pub abandoned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn vote_round(expires_at: DateTime<Utc>) -> Round {
        Round {
            round_id: Uuid::new_v4(),
            player_id: Uuid::new_v4(),
            status: RoundStatus::Active,
            cost: 1,
            created_at: expires_at - Duration::seconds(60),
            expires_at,
            kind: RoundKind::Vote {
                phraseset_id: Uuid::new_v4(),
                submitted_at: None,
            },
        }
    }

    #[test]
    fn grace_window_extends_expiry() {
        let expires = Utc::now();
        let round = vote_round(expires);
        assert!(!round.is_past_grace(expires + Duration::seconds(4), 5));
        assert!(!round.is_past_grace(expires + Duration::seconds(5), 5));
        assert!(round.is_past_grace(expires + Duration::seconds(6), 5));
    }

    #[test]
    fn round_serializes_with_type_tag() {
        let round = vote_round(Utc::now());
        let value = serde_json::to_value(&round).unwrap();
        assert_eq!(value["round_type"], "vote");
        assert_eq!(value["status"], "active");
    }
}
