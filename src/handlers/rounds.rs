//! # Round Handlers
//!
//! Start and submit endpoints for the three round types, the
//! availability probe, and round detail.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;
use crate::handlers::require_player_id;
use crate::models::{Round, RoundKind};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StartPromptRoundResponse {
    pub round_id: Uuid,
    pub prompt_text: String,
    pub expires_at: DateTime<Utc>,
    pub cost: i64,
}

/// Starts a prompt round for the calling player.
///
/// POST /api/rounds/prompt
///
/// # Returns
/// * `200` - Round id, prompt text, expiry, and cost
/// * `400` - `insufficient_balance`, `already_in_round`,
///   `max_outstanding_prompts`, or `no_prompts_enabled`
pub async fn start_prompt_round(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StartPromptRoundResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let round = state.rounds.start_prompt_round(player_id).await?;
    let prompt_text = match &round.kind {
        RoundKind::Prompt { prompt_text, .. } => prompt_text.clone(),
        _ => String::new(),
    };
    Ok(Json(StartPromptRoundResponse {
        round_id: round.round_id,
        prompt_text,
        expires_at: round.expires_at,
        cost: round.cost,
    }))
}

#[derive(Debug, Serialize)]
pub struct StartCopyRoundResponse {
    pub round_id: Uuid,
    pub original_phrase: String,
    pub prompt_round_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub cost: i64,
    pub discount_active: bool,
}

/// Starts a copy round against the oldest eligible queued prompt.
///
/// POST /api/rounds/copy
///
/// # Returns
/// * `200` - Round id, the phrase to imitate, expiry, the cost paid,
///   and whether the queue discount priced it
/// * `400` - `insufficient_balance`, `already_in_round`, or
///   `no_prompts_available`
pub async fn start_copy_round(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StartCopyRoundResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let started = state.rounds.start_copy_round(player_id).await?;
    let (original_phrase, prompt_round_id) = match &started.round.kind {
        RoundKind::Copy {
            original_phrase,
            prompt_round_id,
            ..
        } => (original_phrase.clone(), *prompt_round_id),
        _ => (String::new(), Uuid::nil()),
    };
    Ok(Json(StartCopyRoundResponse {
        round_id: started.round.round_id,
        original_phrase,
        prompt_round_id,
        expires_at: started.round.expires_at,
        cost: started.round.cost,
        discount_active: started.discount_active,
    }))
}

#[derive(Debug, Serialize)]
pub struct StartVoteRoundResponse {
    pub round_id: Uuid,
    pub phraseset_id: Uuid,
    pub prompt_text: String,
    pub phrases: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub cost: i64,
}

/// Starts a vote round on a phraseset chosen by closing priority.
///
/// POST /api/rounds/vote
///
/// # Returns
/// * `200` - Round id, the phraseset, and its three phrases shuffled
/// * `400` - `insufficient_balance`, `already_in_round`, or
///   `no_phrasesets_available`
pub async fn start_vote_round(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StartVoteRoundResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let started = state.votes.start_vote_round(player_id).await?;
    Ok(Json(StartVoteRoundResponse {
        round_id: started.round.round_id,
        phraseset_id: started.phraseset_id,
        prompt_text: started.prompt_text,
        phrases: started.phrases,
        expires_at: started.round.expires_at,
        cost: started.round.cost,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitPhraseRequest {
    pub phrase: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitPhraseResponse {
    pub success: bool,
    pub phrase_normalized: String,
}

/// Submits a phrase for a prompt or copy round.
///
/// POST /api/rounds/{round_id}/submit
///
/// Dispatches on the round's own type, so the client does not need
/// separate prompt/copy submission endpoints.
///
/// # Arguments
/// * `round_id` - Path segment; must be the caller's round
/// * body - `{"phrase": "..."}`
///
/// # Returns
/// * `200` - `{success, phrase_normalized}`
/// * `400` - `invalid_phrase`, `duplicate_phrase`,
///   `phrase_too_similar`, or `round_expired`, each with a reason
/// * `404` - `round_not_found`
pub async fn submit_phrase(
    State(state): State<AppState>,
    Path(round_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<SubmitPhraseRequest>,
) -> Result<Json<SubmitPhraseResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let round = state.rounds.round_for_player(player_id, round_id).await?;

    let normalized = match round.kind {
        RoundKind::Prompt { .. } => {
            state
                .rounds
                .submit_prompt_phrase(player_id, round_id, &request.phrase)
                .await?
        }
        RoundKind::Copy { .. } => {
            state
                .rounds
                .submit_copy_phrase(player_id, round_id, &request.phrase)
                .await?
        }
        RoundKind::Vote { .. } => return Err(GameError::RoundNotFound),
    };

    Ok(Json(SubmitPhraseResponse {
        success: true,
        phrase_normalized: normalized,
    }))
}

#[derive(Debug, Serialize)]
pub struct RoundAvailabilityResponse {
    pub can_prompt: bool,
    pub can_copy: bool,
    pub can_vote: bool,
    pub prompts_waiting: usize,
    pub phrasesets_waiting: usize,
    pub copy_discount_active: bool,
    pub copy_cost: i64,
    pub current_round_id: Option<Uuid>,
}

/// Reports which round types the caller can start right now.
///
/// GET /api/rounds/available
///
/// # Returns
/// * `200` - Per-type flags plus queue depths, the current copy cost,
///   and the discount state; `prompts_waiting` excludes the caller's
///   own and cooldown-blocked prompts
pub async fn get_round_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RoundAvailabilityResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let player = state.players.get_player(player_id).await?;

    let prompts_waiting = state.rounds.available_prompt_count(player_id).await;
    let phrasesets_waiting = state.votes.count_available_for_player(player_id).await;
    let copy_cost = state.queue.copy_cost().await;
    let copy_discount_active = state.queue.copy_discount_active().await;

    let can_prompt = state.players.can_start_prompt_round(&player).await.is_ok();
    let can_copy = state
        .players
        .can_start_copy_round(&player, copy_cost, prompts_waiting)
        .is_ok();
    let can_vote = state
        .players
        .can_start_vote_round(&player, phrasesets_waiting)
        .is_ok();

    Ok(Json(RoundAvailabilityResponse {
        can_prompt,
        can_copy,
        can_vote,
        prompts_waiting,
        phrasesets_waiting,
        copy_discount_active,
        copy_cost,
        current_round_id: player.active_round_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct RoundDetailsResponse {
    pub round_id: Uuid,
    pub round_type: &'static str,
    pub status: crate::models::RoundStatus,
    pub expires_at: DateTime<Utc>,
    pub cost: i64,
    pub prompt_text: Option<String>,
    pub original_phrase: Option<String>,
    pub submitted_phrase: Option<String>,
}

/// Round detail for its owner.
///
/// GET /api/rounds/{round_id}
///
/// # Returns
/// * `200` - Type, status, expiry, cost, and the phrases involved
/// * `404` - `round_not_found` (including rounds owned by others)
pub async fn get_round_details(
    State(state): State<AppState>,
    Path(round_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<RoundDetailsResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let round = state.rounds.round_for_player(player_id, round_id).await?;
    Ok(Json(round_details(&round)))
}

fn round_details(round: &Round) -> RoundDetailsResponse {
    let (prompt_text, original_phrase, submitted_phrase) = match &round.kind {
        RoundKind::Prompt {
            prompt_text,
            submitted_phrase,
            ..
        } => (Some(prompt_text.clone()), None, submitted_phrase.clone()),
        RoundKind::Copy {
            original_phrase,
            submitted_phrase,
            ..
        } => (None, Some(original_phrase.clone()), submitted_phrase.clone()),
        RoundKind::Vote { .. } => (None, None, None),
    };
    RoundDetailsResponse {
        round_id: round.round_id,
        round_type: round.kind_name(),
        status: round.status,
        expires_at: round.expires_at,
        cost: round.cost,
        prompt_text,
        original_phrase,
        submitted_phrase,
    }
}
