//! In-Memory Transport
//!
//! Records every call and answers relationship lookups from local state.
//! Individual operations can be made to fail, which makes it the transport
//! of choice for exercising the agent without a network.

use super::traits::*;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Reply { target: ReplyTarget, text: String },
    Favorite { post_id: String },
    Reshare { post_id: String },
    Post { text: String },
    Follow { handle: String },
    Unfollow { handle: String },
    Block { handles: Vec<String> },
    DeletePosts { ids: Vec<String> },
    PrivateMessage { handle: String, text: String },
    IsFollowing { handle: String, other: String },
    FetchRecentPost { handle: String },
}

impl TransportCall {
    /// Operation name, as accepted by `MemoryTransport::fail`
    pub fn op(&self) -> &'static str {
        match self {
            Self::Reply { .. } => "reply",
            Self::Favorite { .. } => "favorite",
            Self::Reshare { .. } => "reshare",
            Self::Post { .. } => "post",
            Self::Follow { .. } => "follow",
            Self::Unfollow { .. } => "unfollow",
            Self::Block { .. } => "block",
            Self::DeletePosts { .. } => "delete_posts",
            Self::PrivateMessage { .. } => "send_private_message",
            Self::IsFollowing { .. } => "is_following",
            Self::FetchRecentPost { .. } => "fetch_recent_post",
        }
    }
}

#[derive(Default)]
pub struct MemoryTransport {
    calls: Mutex<Vec<TransportCall>>,
    /// (follower, followed) pairs
    follows: Mutex<HashSet<(String, String)>>,
    recent_posts: Mutex<HashMap<String, Post>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `follower` follows `followed`
    pub fn add_follow(&self, follower: &str, followed: &str) {
        self.follows
            .lock()
            .insert((follower.to_string(), followed.to_string()));
    }

    pub fn set_recent_post(&self, post: Post) {
        self.recent_posts.lock().insert(post.author.clone(), post);
    }

    /// Make every subsequent call to `op` fail
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.lock().remove(op);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    /// Calls for one operation name
    pub fn calls_to(&self, op: &str) -> Vec<TransportCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.op() == op)
            .cloned()
            .collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    /// Texts of private messages sent to `handle`
    pub fn private_messages_to(&self, handle: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                TransportCall::PrivateMessage { handle: h, text } if h == handle => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: TransportCall) -> Result<(), TransportError> {
        let op = call.op();
        self.calls.lock().push(call);
        if self.failing.lock().contains(op) {
            return Err(TransportError::Rejected(format!("{} failed", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn reply(&self, target: &ReplyTarget, text: &str) -> Result<(), TransportError> {
        self.record(TransportCall::Reply {
            target: target.clone(),
            text: text.to_string(),
        })
    }

    async fn favorite(&self, post: &Post) -> Result<(), TransportError> {
        self.record(TransportCall::Favorite {
            post_id: post.id.clone(),
        })
    }

    async fn reshare(&self, post: &Post) -> Result<(), TransportError> {
        self.record(TransportCall::Reshare {
            post_id: post.id.clone(),
        })
    }

    async fn post(&self, text: &str) -> Result<String, TransportError> {
        self.record(TransportCall::Post {
            text: text.to_string(),
        })?;
        Ok(self.count("post").to_string())
    }

    async fn follow(&self, handle: &str) -> Result<(), TransportError> {
        self.record(TransportCall::Follow {
            handle: handle.to_string(),
        })
    }

    async fn unfollow(&self, handle: &str) -> Result<(), TransportError> {
        self.record(TransportCall::Unfollow {
            handle: handle.to_string(),
        })
    }

    async fn block(&self, handles: &[String]) -> Result<(), TransportError> {
        self.record(TransportCall::Block {
            handles: handles.to_vec(),
        })
    }

    async fn delete_posts(&self, ids: &[String]) -> Result<(), TransportError> {
        self.record(TransportCall::DeletePosts { ids: ids.to_vec() })
    }

    async fn send_private_message(&self, handle: &str, text: &str) -> Result<(), TransportError> {
        self.record(TransportCall::PrivateMessage {
            handle: handle.to_string(),
            text: text.to_string(),
        })
    }

    async fn is_following(&self, handle: &str, other: &str) -> Result<bool, TransportError> {
        self.record(TransportCall::IsFollowing {
            handle: handle.to_string(),
            other: other.to_string(),
        })?;
        Ok(self
            .follows
            .lock()
            .contains(&(handle.to_string(), other.to_string())))
    }

    async fn fetch_recent_post(&self, handle: &str) -> Result<Option<Post>, TransportError> {
        self.record(TransportCall::FetchRecentPost {
            handle: handle.to_string(),
        })?;
        Ok(self.recent_posts.lock().get(handle).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let transport = MemoryTransport::new();
        transport.follow("alice").await.unwrap();
        transport.post("hello").await.unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::Follow { handle: "alice".to_string() },
                TransportCall::Post { text: "hello".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let transport = MemoryTransport::new();
        transport.fail("block");
        assert!(transport.block(&["bob".to_string()]).await.is_err());
        assert_eq!(transport.count("block"), 1);

        transport.recover("block");
        assert!(transport.block(&["bob".to_string()]).await.is_ok());
    }

    #[tokio::test]
    async fn test_relationship_lookup() {
        let transport = MemoryTransport::new();
        transport.add_follow("carol", "owner");
        assert!(transport.is_following("carol", "owner").await.unwrap());
        assert!(!transport.is_following("owner", "carol").await.unwrap());
    }
}
