//! Transport Trait Definitions
//!
//! The social network is reached only through these interfaces. Network
//! calls, authentication and HTTP-level retries live behind them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error returned by a transport operation.
///
/// The core never branches on the cause: failures are logged, or reported
/// to the owner, with this message.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// A public post (timeline item or mention)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Network-assigned post ID
    pub id: String,

    /// Author handle, without the leading '@'
    pub author: String,

    /// Post text
    pub text: String,

    /// Whether this post is a re-share of someone else's post
    #[serde(default)]
    pub is_reshare: bool,

    /// Unix timestamp
    #[serde(default = "now_timestamp")]
    pub created_at: i64,
}

impl Post {
    pub fn new(id: &str, author: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            author: author.to_string(),
            text: text.to_string(),
            is_reshare: false,
            created_at: now_timestamp(),
        }
    }

    /// Mark as a re-share
    pub fn reshared(mut self) -> Self {
        self.is_reshare = true;
        self
    }
}

/// A private message addressed to the bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: String,
    pub sender: String,
    pub text: String,
    #[serde(default = "now_timestamp")]
    pub created_at: i64,
}

impl DirectMessage {
    pub fn new(id: &str, sender: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            sender: sender.to_string(),
            text: text.to_string(),
            created_at: now_timestamp(),
        }
    }
}

/// Where a reply should be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    /// Public reply threaded under a post
    Post { id: String, author: String },
    /// Private reply in a direct-message conversation
    Direct { sender: String },
}

impl ReplyTarget {
    /// Handle of the user being replied to
    pub fn handle(&self) -> &str {
        match self {
            ReplyTarget::Post { author, .. } => author,
            ReplyTarget::Direct { sender } => sender,
        }
    }
}

impl From<&Post> for ReplyTarget {
    fn from(post: &Post) -> Self {
        ReplyTarget::Post {
            id: post.id.clone(),
            author: post.author.clone(),
        }
    }
}

impl From<&DirectMessage> for ReplyTarget {
    fn from(dm: &DirectMessage) -> Self {
        ReplyTarget::Direct {
            sender: dm.sender.clone(),
        }
    }
}

/// Transport trait - implement once per social network client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reply to a post or a direct message
    async fn reply(&self, target: &ReplyTarget, text: &str) -> Result<(), TransportError>;

    /// Favorite (like) a post
    async fn favorite(&self, post: &Post) -> Result<(), TransportError>;

    /// Re-share a post to the bot's own followers
    async fn reshare(&self, post: &Post) -> Result<(), TransportError>;

    /// Publish an unprompted post, returning its ID
    async fn post(&self, text: &str) -> Result<String, TransportError>;

    async fn follow(&self, handle: &str) -> Result<(), TransportError>;

    async fn unfollow(&self, handle: &str) -> Result<(), TransportError>;

    /// Block every handle in the list
    async fn block(&self, handles: &[String]) -> Result<(), TransportError>;

    /// Delete every post in the list
    async fn delete_posts(&self, ids: &[String]) -> Result<(), TransportError>;

    async fn send_private_message(&self, handle: &str, text: &str) -> Result<(), TransportError>;

    /// Whether `handle` currently follows `other`
    async fn is_following(&self, handle: &str, other: &str) -> Result<bool, TransportError>;

    /// Most recent original (non-reply) post by `handle`
    async fn fetch_recent_post(&self, handle: &str) -> Result<Option<Post>, TransportError>;
}

fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
