//! Dry-Run Transport
//!
//! Logs every outbound call instead of talking to a network. Used by the
//! binary so the decision core can be exercised against recorded events.

use super::traits::*;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Transport that only logs
pub struct DryRunTransport {
    /// Handles reported as following the owner
    followers_of_owner: HashSet<String>,
    next_post_id: AtomicU64,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self {
            followers_of_owner: HashSet::new(),
            next_post_id: AtomicU64::new(1),
        }
    }

    /// Seed the relationship lookup answered by `is_following`
    pub fn with_followers<I, S>(mut self, handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.followers_of_owner
            .extend(handles.into_iter().map(Into::into));
        self
    }
}

impl Default for DryRunTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn reply(&self, target: &ReplyTarget, text: &str) -> Result<(), TransportError> {
        match target {
            ReplyTarget::Post { id, author } => info!("[dry-run] reply to @{} ({}): {}", author, id, text),
            ReplyTarget::Direct { sender } => info!("[dry-run] DM reply to @{}: {}", sender, text),
        }
        Ok(())
    }

    async fn favorite(&self, post: &Post) -> Result<(), TransportError> {
        info!("[dry-run] favorite {} by @{}", post.id, post.author);
        Ok(())
    }

    async fn reshare(&self, post: &Post) -> Result<(), TransportError> {
        info!("[dry-run] reshare {} by @{}", post.id, post.author);
        Ok(())
    }

    async fn post(&self, text: &str) -> Result<String, TransportError> {
        let id = self.next_post_id.fetch_add(1, Ordering::Relaxed).to_string();
        info!("[dry-run] post {}: {}", id, text);
        Ok(id)
    }

    async fn follow(&self, handle: &str) -> Result<(), TransportError> {
        info!("[dry-run] follow @{}", handle);
        Ok(())
    }

    async fn unfollow(&self, handle: &str) -> Result<(), TransportError> {
        info!("[dry-run] unfollow @{}", handle);
        Ok(())
    }

    async fn block(&self, handles: &[String]) -> Result<(), TransportError> {
        info!("[dry-run] block {:?}", handles);
        Ok(())
    }

    async fn delete_posts(&self, ids: &[String]) -> Result<(), TransportError> {
        info!("[dry-run] delete posts {:?}", ids);
        Ok(())
    }

    async fn send_private_message(&self, handle: &str, text: &str) -> Result<(), TransportError> {
        info!("[dry-run] DM to @{}: {}", handle, text);
        Ok(())
    }

    async fn is_following(&self, handle: &str, _other: &str) -> Result<bool, TransportError> {
        Ok(self
            .followers_of_owner
            .iter()
            .any(|h| h.eq_ignore_ascii_case(handle)))
    }

    async fn fetch_recent_post(&self, _handle: &str) -> Result<Option<Post>, TransportError> {
        Ok(None)
    }
}
