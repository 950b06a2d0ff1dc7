//! # Application Configuration
//!
//! Every tunable the engine recognizes, loaded from environment variables
//! with sane defaults. `load_env()` should be called once in `main()`
//! before anything reads the environment; tests construct `GameConfig`
//! directly and override fields.
//!
//! All monetary values are whole game dollars; all durations are seconds.

use std::env;
use std::str::FromStr;

/// Loads environment variables from a `.env` file if present.
///
/// Missing files are fine - the process environment is used as-is.
pub fn load_env() {
    dotenvy::dotenv().ok();
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            panic!("{key} must parse as {}", std::any::type_name::<T>())
        }),
        Err(_) => default,
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Game constants, timing windows, and validation thresholds.
#[derive(Debug, Clone)]
pub struct GameConfig {
    // Economy
    pub starting_balance: i64,
    pub daily_bonus_amount: i64,
    pub prompt_cost: i64,
    pub copy_cost_normal: i64,
    pub copy_cost_discount: i64,
    pub vote_cost: i64,
    pub vote_payout_correct: i64,
    pub phraseset_prize_pool: i64,
    pub max_outstanding_prompts: usize,
    pub copy_discount_threshold: usize,

    // Timing
    pub prompt_round_seconds: i64,
    pub copy_round_seconds: i64,
    pub vote_round_seconds: i64,
    pub grace_period_seconds: i64,

    // Phrase validation
    pub phrase_min_words: usize,
    pub phrase_max_words: usize,
    pub phrase_max_length: usize,
    pub phrase_min_char_per_word: usize,
    pub phrase_max_char_per_word: usize,
    pub significant_word_min_length: usize,

    // Similarity checking
    pub similarity_threshold: f32,
    pub word_similarity_threshold: f32,
    pub similarity_api_url: Option<String>,
    pub similarity_api_key: Option<String>,
    pub similarity_model: String,

    // Finalization windows
    pub vote_finalize_max: u32,
    pub fifth_vote_close_seconds: i64,
    pub third_vote_timeout_seconds: i64,

    // Housekeeping
    pub abandonment_cooldown_hours: i64,
    pub lock_timeout_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub dictionary_path: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1000,
            daily_bonus_amount: 100,
            prompt_cost: 100,
            copy_cost_normal: 100,
            copy_cost_discount: 90,
            vote_cost: 1,
            vote_payout_correct: 5,
            phraseset_prize_pool: 300,
            max_outstanding_prompts: 10,
            copy_discount_threshold: 10,

            prompt_round_seconds: 180,
            copy_round_seconds: 180,
            vote_round_seconds: 60,
            grace_period_seconds: 5,

            phrase_min_words: 1,
            phrase_max_words: 5,
            phrase_max_length: 100,
            phrase_min_char_per_word: 2,
            phrase_max_char_per_word: 15,
            significant_word_min_length: 4,

            similarity_threshold: 0.85,
            word_similarity_threshold: 0.85,
            similarity_api_url: None,
            similarity_api_key: None,
            similarity_model: "all-mpnet-base-v2".to_string(),

            vote_finalize_max: 20,
            fifth_vote_close_seconds: 60,
            third_vote_timeout_seconds: 600,

            abandonment_cooldown_hours: 24,
            lock_timeout_seconds: 10,
            sweep_interval_seconds: 2,
            dictionary_path: "data/dictionary.txt".to_string(),
        }
    }
}

impl GameConfig {
    /// Builds the config from the process environment, falling back to the
    /// defaults above for anything unset.
    ///
    /// # Returns
    /// A fully populated `GameConfig`.
    ///
    /// # Panics
    /// Panics when a set variable does not parse as its expected type;
    /// a misconfigured deployment should fail at startup, not mid-game.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            starting_balance: env_or("STARTING_BALANCE", defaults.starting_balance),
            daily_bonus_amount: env_or("DAILY_BONUS_AMOUNT", defaults.daily_bonus_amount),
            prompt_cost: env_or("PROMPT_COST", defaults.prompt_cost),
            copy_cost_normal: env_or("COPY_COST_NORMAL", defaults.copy_cost_normal),
            copy_cost_discount: env_or("COPY_COST_DISCOUNT", defaults.copy_cost_discount),
            vote_cost: env_or("VOTE_COST", defaults.vote_cost),
            vote_payout_correct: env_or("VOTE_PAYOUT_CORRECT", defaults.vote_payout_correct),
            phraseset_prize_pool: env_or("PHRASESET_PRIZE_POOL", defaults.phraseset_prize_pool),
            max_outstanding_prompts: env_or(
                "MAX_OUTSTANDING_PROMPTS",
                defaults.max_outstanding_prompts,
            ),
            copy_discount_threshold: env_or(
                "COPY_DISCOUNT_THRESHOLD",
                defaults.copy_discount_threshold,
            ),

            prompt_round_seconds: env_or("PROMPT_ROUND_SECONDS", defaults.prompt_round_seconds),
            copy_round_seconds: env_or("COPY_ROUND_SECONDS", defaults.copy_round_seconds),
            vote_round_seconds: env_or("VOTE_ROUND_SECONDS", defaults.vote_round_seconds),
            grace_period_seconds: env_or("GRACE_PERIOD_SECONDS", defaults.grace_period_seconds),

            phrase_min_words: env_or("PHRASE_MIN_WORDS", defaults.phrase_min_words),
            phrase_max_words: env_or("PHRASE_MAX_WORDS", defaults.phrase_max_words),
            phrase_max_length: env_or("PHRASE_MAX_LENGTH", defaults.phrase_max_length),
            phrase_min_char_per_word: env_or(
                "PHRASE_MIN_CHAR_PER_WORD",
                defaults.phrase_min_char_per_word,
            ),
            phrase_max_char_per_word: env_or(
                "PHRASE_MAX_CHAR_PER_WORD",
                defaults.phrase_max_char_per_word,
            ),
            significant_word_min_length: env_or(
                "SIGNIFICANT_WORD_MIN_LENGTH",
                defaults.significant_word_min_length,
            ),

            similarity_threshold: env_or("SIMILARITY_THRESHOLD", defaults.similarity_threshold),
            word_similarity_threshold: env_or(
                "WORD_SIMILARITY_THRESHOLD",
                defaults.word_similarity_threshold,
            ),
            similarity_api_url: env_opt("SIMILARITY_API_URL"),
            similarity_api_key: env_opt("SIMILARITY_API_KEY"),
            similarity_model: env_or("SIMILARITY_MODEL", defaults.similarity_model),

            vote_finalize_max: env_or("VOTE_FINALIZE_MAX", defaults.vote_finalize_max),
            fifth_vote_close_seconds: env_or(
                "FIFTH_VOTE_CLOSE_SECONDS",
                defaults.fifth_vote_close_seconds,
            ),
            third_vote_timeout_seconds: env_or(
                "THIRD_VOTE_TIMEOUT_SECONDS",
                defaults.third_vote_timeout_seconds,
            ),

            abandonment_cooldown_hours: env_or(
                "ABANDONMENT_COOLDOWN_HOURS",
                defaults.abandonment_cooldown_hours,
            ),
            lock_timeout_seconds: env_or("LOCK_TIMEOUT_SECONDS", defaults.lock_timeout_seconds),
            sweep_interval_seconds: env_or(
                "SWEEP_INTERVAL_SECONDS",
                defaults.sweep_interval_seconds,
            ),
            dictionary_path: env_or("DICTIONARY_PATH", defaults.dictionary_path),
        }
    }

    /// 90% of a round's cost, rounded toward zero. Used for the expiry and
    /// abandonment refunds.
    ///
    /// # Arguments
    /// * `cost` - The entry fee the round was charged
    ///
    /// # Returns
    /// The refund amount in whole dollars.
    pub fn refund_for(&self, cost: i64) -> i64 {
        cost * 9 / 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_game_constants() {
        let config = GameConfig::default();
        assert_eq!(config.starting_balance, 1000);
        assert_eq!(config.prompt_cost, 100);
        assert_eq!(config.copy_cost_discount, 90);
        assert_eq!(config.vote_cost, 1);
        assert_eq!(config.phraseset_prize_pool, 300);
        assert_eq!(config.vote_finalize_max, 20);
    }

    #[test]
    fn refund_rounds_toward_zero() {
        let config = GameConfig::default();
        assert_eq!(config.refund_for(100), 90);
        assert_eq!(config.refund_for(90), 81);
        assert_eq!(config.refund_for(95), 85);
        assert_eq!(config.refund_for(1), 0);
    }
}
