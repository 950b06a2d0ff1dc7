//! # HTTP Handlers
//!
//! Thin translation layer between the HTTP surface and the engine
//! services: extract the player, call the service, shape the response.
//! No game logic lives here.
//!
//! Identity arrives as a trusted `X-Player-Id` header set by the
//! upstream authentication plane; the engine itself never sees
//! credentials.

pub mod health;
pub mod phrasesets;
pub mod player;
pub mod rounds;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::error::GameError;

pub use health::health_check;

/// Extracts the authenticated player id from `X-Player-Id`.
pub fn require_player_id(headers: &HeaderMap) -> Result<Uuid, GameError> {
    headers
        .get("x-player-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or(GameError::PlayerNotFound)
}
