//! Social Network Transport
//!
//! Everything the agent sends to the network goes through the `Transport`
//! trait:
//! - Replies, favorites, re-shares and unprompted posts
//! - Follow / unfollow and relationship lookups
//! - Moderation (block, delete)
//! - Private messages to the owner

pub mod dry_run;
pub mod memory;
pub mod traits;

pub use dry_run::DryRunTransport;
pub use memory::{MemoryTransport, TransportCall};
pub use traits::{DirectMessage, Post, ReplyTarget, Transport, TransportError};
