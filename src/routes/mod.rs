//! API route definitions.
//!
//! Connects URL paths to handler functions and applies the shared
//! middleware stack.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::AppState;

/// Builds the complete application router.
///
/// # Route Structure
/// - `POST /api/rounds/{prompt,copy,vote}` - start a round
/// - `POST /api/rounds/{id}/submit` - submit a prompt or copy phrase
/// - `GET  /api/rounds/available` - what this player can start right now
/// - `POST /api/phrasesets/{id}/vote` - submit a vote
/// - `GET  /api/phrasesets/{id}/results` - finalized results bundle
/// - `POST /api/phrasesets/{id}/claim` - idempotent prize claim
/// - `/api/player/...` - account, bonus, history, and dashboard views
/// - `GET  /health` - liveness probe
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Rounds
        .route("/api/rounds/prompt", post(handlers::rounds::start_prompt_round))
        .route("/api/rounds/copy", post(handlers::rounds::start_copy_round))
        .route("/api/rounds/vote", post(handlers::rounds::start_vote_round))
        .route("/api/rounds/available", get(handlers::rounds::get_round_availability))
        .route("/api/rounds/{round_id}/submit", post(handlers::rounds::submit_phrase))
        .route("/api/rounds/{round_id}", get(handlers::rounds::get_round_details))
        // Phrasesets
        .route("/api/phrasesets/{phraseset_id}/vote", post(handlers::phrasesets::submit_vote))
        .route(
            "/api/phrasesets/{phraseset_id}/results",
            get(handlers::phrasesets::get_phraseset_results),
        )
        .route(
            "/api/phrasesets/{phraseset_id}/claim",
            post(handlers::phrasesets::claim_phraseset_prize),
        )
        .route(
            "/api/phrasesets/{phraseset_id}",
            get(handlers::phrasesets::get_phraseset_detail),
        )
        // Player
        .route("/api/player", post(handlers::player::create_player))
        .route("/api/player/balance", get(handlers::player::get_balance))
        .route(
            "/api/player/claim-daily-bonus",
            post(handlers::player::claim_daily_bonus),
        )
        .route("/api/player/current-round", get(handlers::player::get_current_round))
        .route("/api/player/transactions", get(handlers::player::get_transactions))
        .route(
            "/api/player/phrasesets/summary",
            get(handlers::player::get_phraseset_summary),
        )
        .route("/api/player/phrasesets", get(handlers::player::list_player_phrasesets))
        .route(
            "/api/player/unclaimed-results",
            get(handlers::player::get_unclaimed_results),
        )
        .route(
            "/api/player/pending-results",
            get(handlers::player::get_pending_results),
        )
        // Health check endpoint
        .route("/health", get(handlers::health_check))
        // Shared state
        .with_state(state)
        // Middleware
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
}
