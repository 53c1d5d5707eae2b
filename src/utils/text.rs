//! Text analysis shared by the full-text indexes.
//!
//! The analyzer owns the stop-word table. It is built once at start-up and
//! handed to stores behind an `Arc`; nothing mutates it afterwards.

use std::collections::HashSet;

/// Splits text into lowercase word terms and drops stop words
#[derive(Debug, Clone, Default)]
pub struct TextAnalyzer {
    stop_words: HashSet<String>,
}

impl TextAnalyzer {
    /// Create an analyzer with the given stop words
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stop_words: stop_words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Analyzer with the English stop-word list
    pub fn english() -> Self {
        Self::new(stop_words::get(stop_words::LANGUAGE::English))
    }

    /// Analyzer that keeps every word
    pub fn without_stop_words() -> Self {
        Self::default()
    }

    /// Whether a lowercase word is a stop word
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Number of stop words
    pub fn stop_word_count(&self) -> usize {
        self.stop_words.len()
    }

    /// Lowercase alphanumeric words of `text`, stop words removed, in order
    pub fn terms(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .filter(|w| !self.is_stop_word(w))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_split_and_lowercase() {
        let analyzer = TextAnalyzer::without_stop_words();
        assert_eq!(
            analyzer.terms("emcee: The MCMC-Hammer (v2.0)"),
            vec!["emcee", "the", "mcmc", "hammer", "v2", "0"]
        );
    }

    #[test]
    fn test_stop_words_removed() {
        let analyzer = TextAnalyzer::new(["the", "of", " A "]);
        assert_eq!(analyzer.stop_word_count(), 3);
        assert_eq!(
            analyzer.terms("The age of a galaxy"),
            vec!["age", "galaxy"]
        );
        assert!(analyzer.terms("the of").is_empty());
    }

    #[test]
    fn test_english_list_loaded() {
        let analyzer = TextAnalyzer::english();
        assert!(analyzer.stop_word_count() > 50);
        assert!(analyzer.is_stop_word("the"));
        assert!(!analyzer.is_stop_word("galaxy"));
    }
}
