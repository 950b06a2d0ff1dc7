//! Domain entities: players, prompts, the three round variants,
//! phrasesets, votes, the transaction journal, result views, daily
//! bonuses, abandonment records, and the activity timeline.

pub mod activity;
pub mod daily_bonus;
pub mod phraseset;
pub mod player;
pub mod prompt;
pub mod result_view;
pub mod round;
pub mod transaction;
pub mod vote;

pub use activity::{Activity, ActivityKind};
pub use daily_bonus::DailyBonus;
pub use phraseset::{Phraseset, PhrasesetStatus};
pub use player::Player;
pub use prompt::Prompt;
pub use result_view::ResultView;
pub use round::{AbandonedPrompt, PromptProgress, Round, RoundKind, RoundStatus};
pub use transaction::{Transaction, TransactionKind};
pub use vote::Vote;
