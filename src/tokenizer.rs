//! Tokenizer - splits post text into word tokens
//!
//! The interest scorer only needs word-level tokens, so the bundled
//! tokenizer is a regex scan rather than a full NLP pipeline.

use once_cell::sync::Lazy;
use regex::Regex;

/// Word tokens, keeping `@handles`, `#tags` and in-word apostrophes intact
static WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[@#]?\w+(?:['’]\w+)*").expect("static regex is valid")
});

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("static regex is valid"));

/// Splits text into a sequence of string tokens
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Default tokenizer: URLs are dropped, punctuation separates words
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let without_urls = URL.replace_all(text, " ");
        WORD.find_iter(&without_urls)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
