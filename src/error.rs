//! # Game Error Taxonomy
//!
//! Every failure the engine can surface, as tagged variants rather than
//! stringly-typed exceptions. Handlers convert these into JSON error
//! responses; services return them through `Result` and never use panics
//! for control flow.
//!
//! Categories:
//! - **Precondition failures**: the request was well-formed but the game
//!   state forbids it (insufficient balance, already in a round, nothing
//!   to copy or vote on). Returned before any state mutation.
//! - **Validation failures**: the submitted phrase broke a rule; these
//!   always carry a human-readable reason.
//! - **Transient failures**: locks timing out or the similarity backend
//!   being unreachable. The caller may retry.
//! - **Internal invariants**: ledger or state-machine corruption. Logged
//!   and surfaced as 500s; the offending operation halts without partial
//!   side effects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

/// All errors surfaced by the game engine.
#[derive(Debug, Clone, Error)]
pub enum GameError {
    // Precondition failures
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("player already has an active round")]
    AlreadyInRound,
    #[error("player has too many outstanding prompts")]
    MaxOutstandingPrompts,
    #[error("no prompts available for copying")]
    NoPromptsAvailable,
    #[error("no prompts enabled in the library")]
    NoPromptsEnabled,
    #[error("no phrasesets available for voting")]
    NoPhrasesetsAvailable,
    #[error("round not found")]
    RoundNotFound,
    #[error("round expired past grace period")]
    RoundExpired,
    #[error("already voted on this phraseset")]
    AlreadyVoted,
    #[error("vote must match one of the three phrases")]
    InvalidChoice,
    #[error("player is not a contributor to this phraseset")]
    NotContributor,
    #[error("phraseset is not finalized yet")]
    NotFinalized,
    #[error("phraseset not found")]
    PhrasesetNotFound,
    #[error("player not found")]
    PlayerNotFound,
    #[error("daily bonus not available")]
    DailyBonusNotAvailable,

    // Validation failures
    #[error("invalid phrase: {0}")]
    InvalidPhrase(String),
    #[error("duplicate phrase: {0}")]
    DuplicatePhrase(String),
    #[error("phrase too similar: {0}")]
    PhraseTooSimilar(String),

    // Transient failures
    #[error("could not acquire lock, try again")]
    LockTimeout,
    #[error("external service unavailable: {0}")]
    ExternalServiceUnavailable(String),
    #[error("queue unavailable")]
    QueueUnavailable,

    // Internal invariants
    #[error("ledger inconsistency: {0}")]
    LedgerInconsistency(String),
    #[error("state machine violation: {0}")]
    StateMachineViolation(String),
}

impl GameError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InsufficientBalance => "insufficient_balance",
            GameError::AlreadyInRound => "already_in_round",
            GameError::MaxOutstandingPrompts => "max_outstanding_prompts",
            GameError::NoPromptsAvailable => "no_prompts_available",
            GameError::NoPromptsEnabled => "no_prompts_enabled",
            GameError::NoPhrasesetsAvailable => "no_phrasesets_available",
            GameError::RoundNotFound => "round_not_found",
            GameError::RoundExpired => "round_expired",
            GameError::AlreadyVoted => "already_voted",
            GameError::InvalidChoice => "invalid_choice",
            GameError::NotContributor => "not_contributor",
            GameError::NotFinalized => "not_finalized",
            GameError::PhrasesetNotFound => "phraseset_not_found",
            GameError::PlayerNotFound => "player_not_found",
            GameError::DailyBonusNotAvailable => "daily_bonus_not_available",
            GameError::InvalidPhrase(_) => "invalid_phrase",
            GameError::DuplicatePhrase(_) => "duplicate_phrase",
            GameError::PhraseTooSimilar(_) => "phrase_too_similar",
            GameError::LockTimeout => "lock_timeout",
            GameError::ExternalServiceUnavailable(_) => "external_service_unavailable",
            GameError::QueueUnavailable => "queue_unavailable",
            GameError::LedgerInconsistency(_) => "ledger_inconsistency",
            GameError::StateMachineViolation(_) => "state_machine_violation",
        }
    }

    /// HTTP status the error maps to at the transport seam.
    pub fn status(&self) -> StatusCode {
        match self {
            GameError::RoundNotFound
            | GameError::PhrasesetNotFound
            | GameError::PlayerNotFound => StatusCode::NOT_FOUND,

            GameError::InsufficientBalance
            | GameError::AlreadyInRound
            | GameError::MaxOutstandingPrompts
            | GameError::NoPromptsAvailable
            | GameError::NoPromptsEnabled
            | GameError::NoPhrasesetsAvailable
            | GameError::RoundExpired
            | GameError::AlreadyVoted
            | GameError::InvalidChoice
            | GameError::NotContributor
            | GameError::NotFinalized
            | GameError::DailyBonusNotAvailable
            | GameError::InvalidPhrase(_)
            | GameError::DuplicatePhrase(_)
            | GameError::PhraseTooSimilar(_) => StatusCode::BAD_REQUEST,

            GameError::LockTimeout
            | GameError::ExternalServiceUnavailable(_)
            | GameError::QueueUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            GameError::LedgerInconsistency(_) | GameError::StateMachineViolation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True when retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GameError::LockTimeout
                | GameError::ExternalServiceUnavailable(_)
                | GameError::QueueUnavailable
        )
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("internal error: {}", self);
        }
        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
