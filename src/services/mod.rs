//! Service layer: one module per engine component.

pub mod activity;
pub mod embedding;
pub mod ledger;
pub mod phrasesets;
pub mod player;
pub mod queue;
pub mod rounds;
pub mod scoring;
pub mod timer;
pub mod validator;
pub mod votes;

pub use activity::ActivityService;
pub use embedding::{EmbeddingBackend, HttpEmbeddingClient, StaticSimilarity};
pub use ledger::TransactionService;
pub use phrasesets::PhrasesetService;
pub use player::PlayerService;
pub use queue::QueueService;
pub use rounds::RoundService;
pub use scoring::ScoringService;
pub use timer::TimerService;
pub use validator::PhraseValidator;
pub use votes::VoteService;
