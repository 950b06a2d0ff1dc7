//! # WordPool Backend
//!
//! Server-side engine for the WordPool word-association game. Players
//! buy into three kinds of short rounds - writing a phrase for a prompt,
//! copying someone else's phrase convincingly, and voting on which of
//! three phrases is the original. A prompt plus two copies forms a
//! phraseset; votes close it under bounded windows, and a fixed prize
//! pool is paid out proportionally to the contributors.
//!
//! The crate is a library plus a thin binary: all game logic lives in
//! the services (`services/`), backed by an in-process transactional
//! store (`store/`), with axum handlers (`handlers/`) translating HTTP
//! on the outside. Integration tests drive the services directly, so
//! the whole engine is exercisable without a socket.
//!
//! Key invariants enforced here:
//! - balances never go negative, and the transaction journal alone can
//!   reconstruct them;
//! - a player has at most one active round;
//! - phraseset finalization happens at most once, and claims are
//!   idempotent acknowledgements rather than disbursements.

use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use config::GameConfig;
use services::{
    ActivityService, EmbeddingBackend, PhraseValidator, PhrasesetService, PlayerService,
    QueueService, RoundService, ScoringService, TimerService, TransactionService, VoteService,
};
use store::GameStore;
use utils::{Clock, Dictionary, LockManager};

pub use routes::build_router;

/// Shared application state: every service wired together over one
/// store, one clock, and one advisory lock table.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GameConfig>,
    pub store: Arc<GameStore>,
    pub clock: Clock,
    pub locks: Arc<LockManager>,
    pub queue: Arc<QueueService>,
    pub ledger: Arc<TransactionService>,
    pub players: Arc<PlayerService>,
    pub rounds: Arc<RoundService>,
    pub votes: Arc<VoteService>,
    pub phrasesets: Arc<PhrasesetService>,
    pub timer: Arc<TimerService>,
}

impl AppState {
    /// Wires up the full engine. The dictionary and similarity backend
    /// are injected so tests can supply small, deterministic ones.
    pub fn new(
        config: GameConfig,
        dictionary: Dictionary,
        embeddings: EmbeddingBackend,
    ) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(GameStore::new());
        let clock = Clock::new();
        let locks = Arc::new(LockManager::new(Duration::from_secs(
            config.lock_timeout_seconds,
        )));

        let queue = Arc::new(QueueService::new(config.clone()));
        let ledger = Arc::new(TransactionService::new(
            store.clone(),
            locks.clone(),
            clock.clone(),
        ));
        let validator = Arc::new(PhraseValidator::new(
            config.clone(),
            dictionary,
            embeddings,
        ));
        let activity = Arc::new(ActivityService::new(store.clone(), clock.clone()));
        let scoring = Arc::new(ScoringService::new(config.clone()));

        let players = Arc::new(PlayerService::new(
            config.clone(),
            store.clone(),
            clock.clone(),
            locks.clone(),
            ledger.clone(),
        ));
        let rounds = Arc::new(RoundService::new(
            config.clone(),
            store.clone(),
            clock.clone(),
            locks.clone(),
            queue.clone(),
            ledger.clone(),
            validator,
            activity.clone(),
        ));
        let votes = Arc::new(VoteService::new(
            config.clone(),
            store.clone(),
            clock.clone(),
            locks.clone(),
            queue.clone(),
            ledger.clone(),
            scoring.clone(),
            activity.clone(),
        ));
        let phrasesets = Arc::new(PhrasesetService::new(
            store.clone(),
            clock.clone(),
            locks.clone(),
            scoring,
            activity,
        ));
        let timer = Arc::new(TimerService::new(
            config.clone(),
            store.clone(),
            clock.clone(),
            rounds.clone(),
            votes.clone(),
        ));

        Self {
            config,
            store,
            clock,
            locks,
            queue,
            ledger,
            players,
            rounds,
            votes,
            phrasesets,
            timer,
        }
    }

    /// Builds the similarity backend the configuration asks for: the
    /// HTTP client when an API is configured, otherwise the disabled
    /// backend (copies then fail closed until one is configured).
    pub fn embeddings_from_config(config: &GameConfig) -> EmbeddingBackend {
        match &config.similarity_api_url {
            Some(url) => EmbeddingBackend::Http(services::HttpEmbeddingClient::new(
                url.clone(),
                config.similarity_api_key.clone(),
                config.similarity_model.clone(),
            )),
            None => {
                tracing::warn!(
                    "SIMILARITY_API_URL not set; copy submissions will be rejected \
                     until a similarity backend is configured"
                );
                EmbeddingBackend::Disabled
            }
        }
    }
}
