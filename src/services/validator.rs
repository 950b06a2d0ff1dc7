//! # Phrase Validator
//!
//! Format, dictionary, and similarity checks for every phrase that
//! enters the game. Prompt submissions get format + dictionary +
//! overlap-with-prompt-text checks; copy submissions additionally get
//! exact-duplicate, significant-word overlap, and sentence-embedding
//! similarity checks against the original phrase and (when present) the
//! other copy.
//!
//! Failure policy: a broken similarity backend rejects copies ("unable
//! to verify uniqueness") but never blocks prompt submissions, where
//! there is no reference phrase to collide with.
//!
//! The validator is a long-lived singleton; the dictionary is loaded at
//! startup and the embedding client initializes itself on first use.

use std::sync::Arc;

use crate::config::GameConfig;
use crate::error::GameError;
use crate::services::embedding::EmbeddingBackend;
use crate::utils::Dictionary;

/// Words allowed regardless of length or dictionary membership.
const CONNECTING_WORDS: [&str; 2] = ["A", "I"];

pub struct PhraseValidator {
    config: Arc<GameConfig>,
    dictionary: Dictionary,
    embeddings: EmbeddingBackend,
}

impl PhraseValidator {
    pub fn new(
        config: Arc<GameConfig>,
        dictionary: Dictionary,
        embeddings: EmbeddingBackend,
    ) -> Self {
        Self {
            config,
            dictionary,
            embeddings,
        }
    }

    /// Trims, collapses interior whitespace, and uppercases.
    pub fn normalize(phrase: &str) -> String {
        phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
    }

    /// Validates a prompt player's phrase.
    ///
    /// # Arguments
    /// * `phrase` - The raw phrase as typed
    /// * `prompt_text` - The prompt it answers, used for the
    ///   significant-word overlap check
    ///
    /// # Returns
    /// * `Ok(String)` - The normalized phrase
    /// * `Err(InvalidPhrase)` - Format or dictionary failure
    /// * `Err(PhraseTooSimilar)` - Shares a significant word with the
    ///   prompt text
    pub fn validate_prompt_phrase(
        &self,
        phrase: &str,
        prompt_text: &str,
    ) -> Result<String, GameError> {
        let normalized = self.check_format(phrase)?;
        self.check_word_overlap(&normalized, prompt_text, "the prompt")?;
        Ok(normalized)
    }

    /// Validates a copy player's phrase against the original, the other
    /// copy when already submitted, and the prompt text.
    ///
    /// # Arguments
    /// * `phrase` - The raw copy phrase as typed
    /// * `original` - The prompt player's phrase
    /// * `other_copy` - The other submitted copy, when one exists
    /// * `prompt_text` - The originating prompt
    ///
    /// # Returns
    /// * `Ok(String)` - The normalized phrase
    /// * `Err(InvalidPhrase)` - Format or dictionary failure
    /// * `Err(DuplicatePhrase)` - Exactly matches the original or the
    ///   other copy after normalization
    /// * `Err(PhraseTooSimilar)` - Word overlap, near-duplicate words,
    ///   embedding similarity over the threshold, or an unreachable
    ///   similarity backend (copies fail closed)
    pub async fn validate_copy_phrase(
        &self,
        phrase: &str,
        original: &str,
        other_copy: Option<&str>,
        prompt_text: &str,
    ) -> Result<String, GameError> {
        let normalized = self.check_format(phrase)?;
        let original_normalized = Self::normalize(original);

        if normalized == original_normalized {
            return Err(GameError::DuplicatePhrase(
                "cannot submit the same phrase as the original".to_string(),
            ));
        }
        if let Some(other) = other_copy {
            if normalized == Self::normalize(other) {
                return Err(GameError::DuplicatePhrase(
                    "cannot submit the same phrase as the other copy".to_string(),
                ));
            }
        }

        self.check_word_overlap(&normalized, original, "the original phrase")?;
        if let Some(other) = other_copy {
            self.check_word_overlap(&normalized, other, "the other copy")?;
        }
        self.check_word_overlap(&normalized, prompt_text, "the prompt")?;

        self.check_semantic_similarity(&normalized, original, "the original phrase")
            .await?;
        if let Some(other) = other_copy {
            self.check_semantic_similarity(&normalized, other, "the other copy")
                .await?;
        }

        Ok(normalized)
    }

    // ------------------------------------------------------------------
    // Format and dictionary
    // ------------------------------------------------------------------

    fn check_format(&self, phrase: &str) -> Result<String, GameError> {
        let trimmed = phrase.trim();
        if trimmed.is_empty() {
            return Err(GameError::InvalidPhrase("phrase cannot be empty".into()));
        }
        if trimmed.len() > self.config.phrase_max_length {
            return Err(GameError::InvalidPhrase(format!(
                "phrase must be {} characters or less",
                self.config.phrase_max_length
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        {
            return Err(GameError::InvalidPhrase(
                "phrase must contain only letters A-Z and spaces".into(),
            ));
        }

        let normalized = Self::normalize(trimmed);
        let words: Vec<&str> = normalized.split(' ').collect();

        if words.len() < self.config.phrase_min_words {
            return Err(GameError::InvalidPhrase(format!(
                "phrase must contain at least {} word",
                self.config.phrase_min_words
            )));
        }
        if words.len() > self.config.phrase_max_words {
            return Err(GameError::InvalidPhrase(format!(
                "phrase must contain at most {} words",
                self.config.phrase_max_words
            )));
        }

        for word in &words {
            if CONNECTING_WORDS.contains(word) {
                continue;
            }
            if word.len() < self.config.phrase_min_char_per_word {
                return Err(GameError::InvalidPhrase(format!(
                    "each word must be at least {} characters",
                    self.config.phrase_min_char_per_word
                )));
            }
            if word.len() > self.config.phrase_max_char_per_word {
                return Err(GameError::InvalidPhrase(format!(
                    "each word must be at most {} characters",
                    self.config.phrase_max_char_per_word
                )));
            }
            if !self.dictionary.contains(word) {
                return Err(GameError::InvalidPhrase(format!(
                    "word '{word}' not in dictionary"
                )));
            }
        }

        Ok(normalized)
    }

    // ------------------------------------------------------------------
    // Significant-word overlap
    // ------------------------------------------------------------------

    fn significant_words<'a>(&self, phrase: &'a str) -> Vec<&'a str> {
        phrase
            .split_whitespace()
            .filter(|w| w.len() >= self.config.significant_word_min_length)
            .collect()
    }

    fn check_word_overlap(
        &self,
        candidate: &str,
        reference: &str,
        reference_name: &str,
    ) -> Result<(), GameError> {
        let reference_normalized = Self::normalize(reference);
        let reference_words = self.significant_words(&reference_normalized);
        if reference_words.is_empty() {
            return Ok(());
        }

        for word in self.significant_words(candidate) {
            for other in &reference_words {
                if word == *other {
                    return Err(GameError::PhraseTooSimilar(format!(
                        "'{}' also appears in {}",
                        word.to_lowercase(),
                        reference_name
                    )));
                }
                if lcs_ratio(word, other) >= self.config.word_similarity_threshold {
                    return Err(GameError::PhraseTooSimilar(format!(
                        "'{}' is too close to '{}' in {}",
                        word.to_lowercase(),
                        other.to_lowercase(),
                        reference_name
                    )));
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Semantic similarity
    // ------------------------------------------------------------------

    async fn check_semantic_similarity(
        &self,
        candidate: &str,
        reference: &str,
        reference_name: &str,
    ) -> Result<(), GameError> {
        let score = match self.embeddings.similarity(candidate, reference).await {
            Ok(score) => score,
            Err(e) => {
                // Copies fail closed: a dead backend must not let
                // near-identical phrases through.
                tracing::error!("similarity check against {} failed: {}", reference_name, e);
                return Err(GameError::PhraseTooSimilar(
                    "unable to verify phrase uniqueness, please try a different phrase"
                        .to_string(),
                ));
            }
        };

        if score >= self.config.similarity_threshold {
            return Err(GameError::PhraseTooSimilar(format!(
                "phrase too similar to {} (similarity: {:.2}, threshold: {:.2})",
                reference_name, score, self.config.similarity_threshold
            )));
        }
        Ok(())
    }
}

/// Similarity of two words as `2*LCS / (len_a + len_b)`, the same ratio
/// the original stack computed for near-duplicate words.
fn lcs_ratio(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            table[i][j] = if a[i - 1] == b[j - 1] {
                table[i - 1][j - 1] + 1
            } else {
                table[i - 1][j].max(table[i][j - 1])
            };
        }
    }
    let lcs = table[a.len()][b.len()];
    (2 * lcs) as f32 / (a.len() + b.len()) as f32
}
