//! # Phraseset Handlers
//!
//! Vote submission, results, detail, and the idempotent prize claim.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;
use crate::handlers::require_player_id;
use crate::services::phrasesets::{ClaimOutcome, PhrasesetDetail, PhrasesetResults};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub phrase: String,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub correct: bool,
    pub payout: i64,
    pub original_phrase: String,
    pub your_choice: String,
}

/// Submits the caller's vote on their active vote round.
///
/// POST /api/phrasesets/{phraseset_id}/vote
///
/// # Arguments
/// * `phraseset_id` - Path segment; must match the active vote round
/// * body - `{"phrase": "..."}`
///
/// # Returns
/// * `200` - `{correct, payout, original_phrase, your_choice}`
/// * `400` - `round_expired`, `already_voted`, or `invalid_choice`
pub async fn submit_vote(
    State(state): State<AppState>,
    Path(phraseset_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let outcome = state
        .votes
        .submit_vote(player_id, phraseset_id, &request.phrase)
        .await?;
    Ok(Json(VoteResponse {
        correct: outcome.correct,
        payout: outcome.payout,
        original_phrase: outcome.original_phrase,
        your_choice: outcome.your_choice,
    }))
}

/// Finalized results bundle for a contributor.
///
/// GET /api/phrasesets/{phraseset_id}/results
///
/// # Returns
/// * `200` - Vote tallies, the caller's role, points, payout, and
///   claim state; the first read stamps the result view
/// * `400` - `not_finalized` or `not_contributor`
/// * `404` - `phraseset_not_found`
pub async fn get_phraseset_results(
    State(state): State<AppState>,
    Path(phraseset_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<PhrasesetResults>, GameError> {
    let player_id = require_player_id(&headers)?;
    let results = state
        .phrasesets
        .results_for_player(player_id, phraseset_id)
        .await?;
    Ok(Json(results))
}

/// Full timeline view for a contributor; works before finalization.
///
/// GET /api/phrasesets/{phraseset_id}
///
/// # Returns
/// * `200` - Contributors, per-vote records, the activity timeline,
///   and the computed results once finalized
/// * `400` - `not_contributor`
/// * `404` - `phraseset_not_found`
pub async fn get_phraseset_detail(
    State(state): State<AppState>,
    Path(phraseset_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<PhrasesetDetail>, GameError> {
    let player_id = require_player_id(&headers)?;
    let detail = state
        .phrasesets
        .detail_for_player(player_id, phraseset_id)
        .await?;
    Ok(Json(detail))
}

/// Idempotent prize claim for a contributor.
///
/// POST /api/phrasesets/{phraseset_id}/claim
///
/// # Returns
/// * `200` - `{success, amount, new_balance, already_claimed}`; repeat
///   calls return the same amount with `already_claimed` set and never
///   pay twice
/// * `400` - `not_finalized` or `not_contributor`
/// * `404` - `phraseset_not_found`
pub async fn claim_phraseset_prize(
    State(state): State<AppState>,
    Path(phraseset_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ClaimOutcome>, GameError> {
    let player_id = require_player_id(&headers)?;
    let outcome = state
        .phrasesets
        .claim_prize(player_id, phraseset_id)
        .await?;
    Ok(Json(outcome))
}
