//! # WordPool Backend Server
//!
//! Binary entry point: loads configuration from the environment, wires
//! the engine together, spawns the timer sweep, and serves the HTTP API.
//!
//! The server listens on `BIND_ADDR` (default `127.0.0.1:8080`). Player
//! identity is expected in the `X-Player-Id` header, set by the upstream
//! authentication plane.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordpool_backend::config::{self, GameConfig};
use wordpool_backend::utils::Dictionary;
use wordpool_backend::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    config::load_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordpool_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let game_config = GameConfig::from_env();
    tracing::info!("Starting WordPool backend...");

    let dictionary = Dictionary::load(&game_config.dictionary_path)
        .context("dictionary is required before accepting traffic")?;
    let embeddings = AppState::embeddings_from_config(&game_config);

    let state = AppState::new(game_config, dictionary, embeddings);

    // Deadline sweeps run for the life of the process.
    Arc::clone(&state.timer).spawn();

    let app = build_router(state);

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()
        .context("BIND_ADDR must be host:port")?;
    tracing::info!("WordPool backend listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listen address")?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
