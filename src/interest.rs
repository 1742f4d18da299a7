//! Interest Scorer
//!
//! Classifies content into engagement tiers using the text model's most
//! frequent vocabulary as a cheap proxy for topical relevance.

use crate::model::TextModel;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Size of the broad keyword view
pub const BROAD_KEYWORDS: usize = 100;

/// Size of the narrow keyword view
pub const NARROW_KEYWORDS: usize = 20;

/// A token count above this many narrow hits makes content very interesting
const NARROW_HIT_THRESHOLD: usize = 2;

/// Engagement tier for one piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EngagementTier {
    NotInteresting,
    Interesting,
    VeryInteresting,
}

impl EngagementTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInteresting => "not_interesting",
            Self::Interesting => "interesting",
            Self::VeryInteresting => "very_interesting",
        }
    }
}

/// Broad and narrow views over the model's ranked vocabulary.
///
/// Terms are lowercased on construction; the sets are never mutated after.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    broad: HashSet<String>,
    narrow: HashSet<String>,
}

impl KeywordSet {
    pub fn new<B, N, S>(broad: B, narrow: N) -> Self
    where
        B: IntoIterator<Item = S>,
        N: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            broad: broad.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
            narrow: narrow.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }

    /// Top 100 / top 20 of the model's frequency ranking
    pub fn from_model(model: &dyn TextModel) -> Self {
        let ranked = model.top_keywords(BROAD_KEYWORDS);
        let narrow: Vec<&String> = ranked.iter().take(NARROW_KEYWORDS).collect();
        Self::new(ranked.iter(), narrow)
    }

    pub fn in_broad(&self, token: &str) -> bool {
        self.broad.contains(&token.to_lowercase())
    }

    pub fn in_narrow(&self, token: &str) -> bool {
        self.narrow.contains(&token.to_lowercase())
    }

    pub fn broad_len(&self) -> usize {
        self.broad.len()
    }

    pub fn narrow_len(&self) -> usize {
        self.narrow.len()
    }
}

/// Classify a token sequence. Duplicate narrow hits each count.
pub fn classify<S: AsRef<str>>(tokens: &[S], keywords: &KeywordSet) -> EngagementTier {
    let narrow_hits = tokens
        .iter()
        .filter(|t| keywords.in_narrow(t.as_ref()))
        .count();

    if narrow_hits > NARROW_HIT_THRESHOLD {
        EngagementTier::VeryInteresting
    } else if tokens.iter().any(|t| keywords.in_broad(t.as_ref())) {
        EngagementTier::Interesting
    } else {
        EngagementTier::NotInteresting
    }
}
