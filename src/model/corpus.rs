//! Corpus Model
//!
//! A small retrieval model over a plain-text corpus (one sentence per line).
//! Keywords are ranked by frequency; statements and responses are sentences
//! drawn from the corpus.

use super::{ModelError, ModelLoader, TextModel, DEFAULT_MAX_LENGTH};
use crate::tokenizer::{Tokenizer, WordTokenizer};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Words that never count as keywords
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "him", "his", "how", "its", "may", "new", "now", "old", "see",
    "two", "who", "did", "get", "got", "let", "say", "she", "too", "use", "that", "with",
    "have", "this", "will", "your", "from", "they", "know", "want", "been", "good", "much",
    "some", "time", "very", "when", "come", "here", "just", "like", "long", "make", "many",
    "more", "only", "over", "such", "take", "than", "them", "well", "were", "what", "about",
    "there", "their", "would", "which", "could", "should", "these", "those", "into", "then",
    "also", "because", "i'm", "it's", "don't", "can't",
];

/// Minimum keyword length in characters
const MIN_KEYWORD_LEN: usize = 3;

pub struct CorpusModel {
    sentences: Vec<String>,
    /// Keywords in descending frequency order
    keywords: Vec<String>,
    max_length: usize,
    rng: Mutex<StdRng>,
}

impl CorpusModel {
    /// Build a model from in-memory sentences
    pub fn from_sentences<I, S>(sentences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sentences: Vec<String> = sentences
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let keywords = rank_keywords(&sentences);

        Self {
            sentences,
            keywords,
            max_length: DEFAULT_MAX_LENGTH,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Load a corpus file
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let model = Self::from_sentences(text.lines());
        if model.sentences.is_empty() {
            return Err(ModelError::EmptyCorpus(path.to_path_buf()));
        }

        info!(
            "Loaded corpus model {:?}: {} sentences, {} keywords",
            path,
            model.sentences.len(),
            model.keywords.len()
        );
        Ok(model)
    }

    /// Use a deterministic sentence picker
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    fn fitting(&self, limit: usize) -> Vec<&String> {
        self.sentences
            .iter()
            .filter(|s| s.chars().count() <= limit)
            .collect()
    }

    fn pick<'a>(&self, candidates: &[&'a String]) -> Option<&'a String> {
        candidates.choose(&mut *self.rng.lock()).copied()
    }

    /// Pick a sentence within `limit`, truncating one if none fits
    fn pick_within(&self, limit: usize) -> Result<String, ModelError> {
        if limit == 0 {
            return Err(ModelError::LimitTooSmall(limit));
        }

        let candidates = self.fitting(limit);
        if let Some(sentence) = self.pick(&candidates) {
            return Ok(sentence.clone());
        }

        let all: Vec<&String> = self.sentences.iter().collect();
        self.pick(&all)
            .map(|s| s.chars().take(limit).collect())
            .ok_or_else(|| ModelError::Generation("corpus is empty".to_string()))
    }
}

#[async_trait]
impl TextModel for CorpusModel {
    fn top_keywords(&self, n: usize) -> Vec<String> {
        self.keywords.iter().take(n).cloned().collect()
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    async fn compose_response(&self, context: &str, limit: usize) -> Result<String, ModelError> {
        if limit == 0 {
            return Err(ModelError::LimitTooSmall(limit));
        }

        let tokenizer = WordTokenizer::new();
        let wanted: HashSet<String> = tokenizer
            .tokenize(context)
            .into_iter()
            .map(|t| t.to_lowercase())
            .filter(|t| is_keyword(t))
            .collect();

        if !wanted.is_empty() {
            let scored: Vec<(usize, &String)> = self
                .fitting(limit)
                .into_iter()
                .map(|s| {
                    let overlap = tokenizer
                        .tokenize(s)
                        .into_iter()
                        .filter(|t| wanted.contains(&t.to_lowercase()))
                        .count();
                    (overlap, s)
                })
                .filter(|(overlap, _)| *overlap > 0)
                .collect();

            if let Some(best) = scored.iter().map(|(overlap, _)| *overlap).max() {
                let top: Vec<&String> = scored
                    .iter()
                    .filter(|(overlap, _)| *overlap == best)
                    .map(|(_, s)| *s)
                    .collect();
                if let Some(sentence) = self.pick(&top) {
                    return Ok(sentence.clone());
                }
            }
        }

        self.pick_within(limit)
    }

    async fn compose_statement(&self) -> Result<String, ModelError> {
        self.pick_within(self.max_length)
    }
}

/// Loads `CorpusModel` from a path at startup
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    path: PathBuf,
    max_length: usize,
    seed: Option<u64>,
}

impl CorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_length: DEFAULT_MAX_LENGTH,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }
}

impl ModelLoader for CorpusLoader {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Arc<dyn TextModel>, ModelError> {
        let mut model = CorpusModel::load(&self.path)?.with_max_length(self.max_length);
        if let Some(seed) = self.seed {
            model = model.with_seed(seed);
        }
        Ok(Arc::new(model))
    }
}

fn is_keyword(token: &str) -> bool {
    token.chars().count() >= MIN_KEYWORD_LEN
        && !token.starts_with('@')
        && !token.starts_with('#')
        && !token.chars().all(|c| c.is_ascii_digit())
        && !STOPWORDS.contains(&token)
}

/// Rank lowercase keywords by frequency, ties broken alphabetically
fn rank_keywords(sentences: &[String]) -> Vec<String> {
    let tokenizer = WordTokenizer::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for sentence in sentences {
        for token in tokenizer.tokenize(sentence) {
            let token = token.to_lowercase();
            if is_keyword(&token) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(word, _)| word).collect()
}
