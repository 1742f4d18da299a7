//! Engagement agent
//!
//! `CloneBot` reacts to inbound events through the `EventHandler` trait.
//! Every outward action it takes is deferred behind a random delay.

pub mod bot;
pub mod deferred;
pub mod handler;
pub mod reply;

pub use bot::CloneBot;
pub use deferred::Deferrer;
pub use handler::{dispatch, EventHandler, InboundEvent};
pub use reply::{strip_mentions, ReplyContext};
