//! Text Model
//!
//! The generative model is an external collaborator. The agent needs three
//! things from it:
//! - A frequency-ranked vocabulary (feeds the interest scorer)
//! - Responses to a given context, bounded by a length limit
//! - Unprompted statements for the scheduled posting job

pub mod corpus;

pub use corpus::{CorpusLoader, CorpusModel};

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Default maximum post length in characters
pub const DEFAULT_MAX_LENGTH: usize = 280;

/// Errors raised by the text model
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to load model {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model {0} contains no usable sentences")]
    EmptyCorpus(PathBuf),

    #[error("Cannot compose text within {0} characters")]
    LimitTooSmall(usize),

    #[error("Generation failed: {0}")]
    Generation(String),
}

/// Generative text model used for every piece of outbound text
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Vocabulary sorted by descending frequency, at most `n` terms
    fn top_keywords(&self, n: usize) -> Vec<String>;

    /// Maximum length of a single post, in characters
    fn max_length(&self) -> usize {
        DEFAULT_MAX_LENGTH
    }

    /// Compose a response to `context` no longer than `limit` characters
    async fn compose_response(&self, context: &str, limit: usize) -> Result<String, ModelError>;

    /// Compose an unprompted statement
    async fn compose_statement(&self) -> Result<String, ModelError>;
}

/// Loads the model at startup
pub trait ModelLoader: Send + Sync {
    /// Human-readable description for logs (usually a path)
    fn describe(&self) -> String;

    fn load(&self) -> Result<Arc<dyn TextModel>, ModelError>;
}

/// Loader for a model that is already in memory
pub struct Preloaded(pub Arc<dyn TextModel>);

impl ModelLoader for Preloaded {
    fn describe(&self) -> String {
        "preloaded model".to_string()
    }

    fn load(&self) -> Result<Arc<dyn TextModel>, ModelError> {
        Ok(self.0.clone())
    }
}
