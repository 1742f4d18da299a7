//! Event handler capability set
//!
//! The hosting runtime drives the agent through `EventHandler` and never
//! needs to know the concrete agent type.

use crate::transport::{DirectMessage, Post};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Startup hook. An error here is fatal.
    async fn configure(&self) -> anyhow::Result<()>;

    async fn on_direct_message(&self, dm: &DirectMessage);

    /// A post addressed to the bot
    async fn on_mention(&self, post: &Post);

    /// A post from the followed timeline
    async fn on_timeline_item(&self, post: &Post);

    /// `handle` started following the bot
    async fn on_follow_notification(&self, handle: &str);
}

/// An event delivered by the streaming source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    DirectMessage(DirectMessage),
    Mention(Post),
    Timeline(Post),
    Follow { handle: String },
}

impl InboundEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectMessage(_) => "direct_message",
            Self::Mention(_) => "mention",
            Self::Timeline(_) => "timeline",
            Self::Follow { .. } => "follow",
        }
    }
}

/// Route one event to its handler
pub async fn dispatch(handler: &dyn EventHandler, event: &InboundEvent) {
    match event {
        InboundEvent::DirectMessage(dm) => handler.on_direct_message(dm).await,
        InboundEvent::Mention(post) => handler.on_mention(post).await,
        InboundEvent::Timeline(post) => handler.on_timeline_item(post).await,
        InboundEvent::Follow { handle } => handler.on_follow_notification(handle).await,
    }
}
