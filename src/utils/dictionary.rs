//! # Dictionary Loader
//!
//! The word list every non-connecting word must appear in. Loaded once at
//! startup and read-only afterwards; lookups are uppercase-normalized.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

/// Uppercase word set backing phrase validation.
#[derive(Debug, Clone)]
pub struct Dictionary {
    words: HashSet<String>,
}

impl Dictionary {
    /// Loads one word per line from `path`, skipping blanks.
    ///
    /// # Arguments
    /// * `path` - Newline-separated word list, any casing
    ///
    /// # Returns
    /// * `Ok(Dictionary)` - The uppercase word set
    /// * `Err` - The file could not be read; startup should fail rather
    ///   than run without a dictionary
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("dictionary file not found: {}", path.display()))?;
        let dictionary = Self::from_text(&raw);
        tracing::info!("Loaded dictionary with {} words", dictionary.len());
        Ok(dictionary)
    }

    /// Builds a dictionary from newline-separated words.
    pub fn from_text(raw: &str) -> Self {
        let words = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_uppercase)
            .collect();
        Self { words }
    }

    /// Builds a dictionary from an explicit word list. Test seam.
    pub fn from_words<I: IntoIterator<Item = S>, S: AsRef<str>>(words: I) -> Self {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_uppercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.trim().to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_insensitive() {
        let dictionary = Dictionary::from_text("freedom\nLIBERTY\n\n  justice  \n");
        assert_eq!(dictionary.len(), 3);
        assert!(dictionary.contains("FREEDOM"));
        assert!(dictionary.contains("liberty"));
        assert!(dictionary.contains(" Justice "));
        assert!(!dictionary.contains("ZZXXYYZZ"));
    }
}
