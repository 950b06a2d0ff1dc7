//! # Player Handlers
//!
//! Account creation (trusted-peer seam), balance, daily bonus, current
//! round, transaction history, and the phraseset list/summary views.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;
use crate::handlers::require_player_id;
use crate::models::{RoundKind, Transaction};
use crate::services::phrasesets::{
    ContributionEntry, DashboardSummary, PendingResult, RoleFilter, StatusFilter,
    UnclaimedResults,
};
use crate::services::player::BalanceView;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreatePlayerResponse {
    pub player_id: Uuid,
    pub balance: i64,
}

/// Creates a player account with the starting balance.
///
/// POST /api/player
///
/// # Returns
/// * `200` - The new player id and balance. Save the id - it is the
///   `X-Player-Id` value for every other call.
pub async fn create_player(State(state): State<AppState>) -> Json<CreatePlayerResponse> {
    let player = state.players.create_player().await;
    Json(CreatePlayerResponse {
        player_id: player.player_id,
        balance: player.balance,
    })
}

/// Balance and account status for the caller.
///
/// GET /api/player/balance
///
/// # Returns
/// * `200` - Balance, daily-bonus availability, last login date, and
///   the outstanding-prompt count
/// * `404` - `player_not_found` when the header is missing or unknown
pub async fn get_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BalanceView>, GameError> {
    let player_id = require_player_id(&headers)?;
    Ok(Json(state.players.balance(player_id).await?))
}

#[derive(Debug, Serialize)]
pub struct ClaimDailyBonusResponse {
    pub success: bool,
    pub amount: i64,
    pub new_balance: i64,
}

/// Claims the once-per-day login bonus.
///
/// POST /api/player/claim-daily-bonus
///
/// # Returns
/// * `200` - `{success, amount, new_balance}`
/// * `400` - `daily_bonus_not_available`
pub async fn claim_daily_bonus(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClaimDailyBonusResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let (amount, new_balance) = state.players.claim_daily_bonus(player_id).await?;
    Ok(Json(ClaimDailyBonusResponse {
        success: true,
        amount,
        new_balance,
    }))
}

#[derive(Debug, Serialize)]
pub struct CurrentRoundResponse {
    pub round_id: Option<Uuid>,
    pub round_type: Option<&'static str>,
    pub expires_at: Option<DateTime<Utc>>,
    pub state: Option<serde_json::Value>,
}

/// The caller's active round, if any.
///
/// GET /api/player/current-round
///
/// Reading the current round settles it first if it timed out, so a
/// client polling this endpoint sees the refund land without waiting
/// for the sweep.
///
/// # Returns
/// * `200` - The round id, type, expiry, and a per-type state payload
///   (vote rounds include the phraseset's phrases, reshuffled per
///   call); all fields null when there is no active round
pub async fn get_current_round(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CurrentRoundResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let Some(round) = state.rounds.current_round(player_id).await? else {
        return Ok(Json(CurrentRoundResponse {
            round_id: None,
            round_type: None,
            expires_at: None,
            state: None,
        }));
    };

    let round_state = match &round.kind {
        RoundKind::Prompt { prompt_text, .. } => serde_json::json!({
            "prompt_text": prompt_text,
            "cost": round.cost,
        }),
        RoundKind::Copy {
            original_phrase,
            prompt_round_id,
            ..
        } => serde_json::json!({
            "original_phrase": original_phrase,
            "prompt_round_id": prompt_round_id,
            "cost": round.cost,
        }),
        RoundKind::Vote { phraseset_id, .. } => {
            let mut payload = serde_json::json!({
                "phraseset_id": phraseset_id,
                "cost": round.cost,
            });
            if let Some(phraseset) = state.store.phraseset(*phraseset_id).await {
                let mut phrases: Vec<String> =
                    phraseset.phrases().iter().map(|p| p.to_string()).collect();
                phrases.shuffle(&mut rand::thread_rng());
                payload["prompt_text"] = serde_json::json!(phraseset.prompt_text);
                payload["phrases"] = serde_json::json!(phrases);
            }
            payload
        }
    };

    Ok(Json(CurrentRoundResponse {
        round_id: Some(round.round_id),
        round_type: Some(round.kind_name()),
        expires_at: Some(round.expires_at),
        state: Some(round_state),
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct TransactionHistoryResponse {
    pub transactions: Vec<Transaction>,
}

/// The caller's transaction journal, newest first.
///
/// GET /api/player/transactions
///
/// # Arguments
/// * `limit` / `offset` - Query parameters; limit is capped at 100
///
/// # Returns
/// * `200` - A page of journal entries with balance-after snapshots
pub async fn get_transactions(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
    headers: HeaderMap,
) -> Result<Json<TransactionHistoryResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    state.players.get_player(player_id).await?;
    let transactions = state
        .ledger
        .history(player_id, query.limit.min(100), query.offset)
        .await;
    Ok(Json(TransactionHistoryResponse { transactions }))
}

#[derive(Debug, Deserialize)]
pub struct PhrasesetListQuery {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct PhrasesetListResponse {
    pub phrasesets: Vec<ContributionEntry>,
    pub total: usize,
    pub has_more: bool,
}

/// Paginated list of the caller's phraseset contributions.
///
/// GET /api/player/phrasesets
///
/// # Arguments
/// * `role` - `all` (default), `prompt`, or `copy`
/// * `status` - `all` (default), `in_progress`, `voting`, `finalized`,
///   or `abandoned`
/// * `limit` / `offset` - Page window, limit clamped to 1..=100
///
/// # Returns
/// * `200` - `{phrasesets, total, has_more}`
pub async fn list_player_phrasesets(
    State(state): State<AppState>,
    Query(query): Query<PhrasesetListQuery>,
    headers: HeaderMap,
) -> Result<Json<PhrasesetListResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let role = RoleFilter::parse(query.role.as_deref().unwrap_or("all"));
    let status = StatusFilter::parse(query.status.as_deref().unwrap_or("all"));
    let limit = query.limit.clamp(1, 100);

    let (phrasesets, total) = state
        .phrasesets
        .list_for_player(player_id, role, status, limit, query.offset)
        .await?;
    let has_more = query.offset + phrasesets.len() < total;
    Ok(Json(PhrasesetListResponse {
        phrasesets,
        total,
        has_more,
    }))
}

/// Dashboard rollup of the caller's phrasesets.
///
/// GET /api/player/phrasesets/summary
///
/// # Returns
/// * `200` - In-progress and finalized counts by role, plus the total
///   unclaimed dollars
pub async fn get_phraseset_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardSummary>, GameError> {
    let player_id = require_player_id(&headers)?;
    Ok(Json(state.phrasesets.summary_for_player(player_id).await?))
}

/// Finalized phrasesets the caller has not acknowledged yet.
///
/// GET /api/player/unclaimed-results
///
/// # Returns
/// * `200` - `{unclaimed, total_unclaimed_amount}`, newest first
pub async fn get_unclaimed_results(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UnclaimedResults>, GameError> {
    let player_id = require_player_id(&headers)?;
    Ok(Json(state.phrasesets.unclaimed_for_player(player_id).await?))
}

#[derive(Debug, Serialize)]
pub struct PendingResultsResponse {
    pub pending: Vec<PendingResult>,
}

/// Finalized phrasesets for the caller's results inbox.
///
/// GET /api/player/pending-results
///
/// # Returns
/// * `200` - `{pending}`, newest finalization first, with claim flags
pub async fn get_pending_results(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PendingResultsResponse>, GameError> {
    let player_id = require_player_id(&headers)?;
    let pending = state.phrasesets.pending_results(player_id).await?;
    Ok(Json(PendingResultsResponse { pending }))
}
