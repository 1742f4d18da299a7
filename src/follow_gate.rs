//! Follow Gate
//!
//! Only follow (and only favorite) our owner or people who follow our owner,
//! unless the bot is configured to follow everyone.

use crate::config::{FollowPolicy, Owner};
use crate::transport::Transport;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct FollowGate {
    policy: FollowPolicy,
    owner: Owner,
    transport: Arc<dyn Transport>,
}

impl FollowGate {
    pub fn new(policy: FollowPolicy, owner: Owner, transport: Arc<dyn Transport>) -> Self {
        Self {
            policy,
            owner,
            transport,
        }
    }

    pub fn policy(&self) -> FollowPolicy {
        self.policy
    }

    /// Whether we may keep a relationship with `handle`.
    ///
    /// A failed relationship lookup counts as "not allowed".
    pub async fn can_follow(&self, handle: &str) -> bool {
        if self.policy == FollowPolicy::AllowAll {
            return true;
        }

        let owner = match self.owner.handle() {
            Some(owner) => owner,
            None => return true,
        };

        if handle.eq_ignore_ascii_case(owner) {
            return true;
        }

        match self.transport.is_following(handle, owner).await {
            Ok(follows) => {
                debug!("@{} follows owner @{}: {}", handle, owner, follows);
                follows
            }
            Err(e) => {
                warn!("Relationship lookup for @{} failed: {}", handle, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn build_gate(policy: FollowPolicy, owner: Option<&str>) -> (FollowGate, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let gate = FollowGate::new(policy, Owner::new(owner), transport.clone());
        (gate, transport)
    }

    #[tokio::test]
    async fn test_allow_all_allows_everyone() {
        let (gate, transport) = build_gate(FollowPolicy::AllowAll, Some("owner"));
        for handle in ["owner", "stranger", "spammer"] {
            assert!(gate.can_follow(handle).await);
        }
        assert_eq!(transport.count("is_following"), 0);
    }

    #[tokio::test]
    async fn test_no_owner_allows_everyone() {
        let (gate, transport) = build_gate(FollowPolicy::OwnerAndFollowersOfOwner, None);
        assert!(gate.can_follow("stranger").await);
        assert_eq!(transport.count("is_following"), 0);
    }

    #[tokio::test]
    async fn test_owner_always_allowed() {
        let (gate, transport) = build_gate(FollowPolicy::OwnerAndFollowersOfOwner, Some("owner"));
        assert!(gate.can_follow("owner").await);
        assert_eq!(transport.count("is_following"), 0);
    }

    #[tokio::test]
    async fn test_owner_match_ignores_case() {
        let (gate, transport) = build_gate(FollowPolicy::OwnerAndFollowersOfOwner, Some("Owner"));
        assert!(gate.can_follow("owner").await);
        assert!(gate.can_follow("OWNER").await);
        assert_eq!(transport.count("is_following"), 0);
    }

    #[tokio::test]
    async fn test_followers_of_owner_allowed() {
        let (gate, transport) = build_gate(FollowPolicy::OwnerAndFollowersOfOwner, Some("owner"));
        transport.add_follow("friend", "owner");

        assert!(gate.can_follow("friend").await);
        assert!(!gate.can_follow("stranger").await);
    }

    #[tokio::test]
    async fn test_lookup_failure_denies() {
        let (gate, transport) = build_gate(FollowPolicy::OwnerAndFollowersOfOwner, Some("owner"));
        transport.add_follow("friend", "owner");
        transport.fail("is_following");

        assert!(!gate.can_follow("friend").await);
    }
}
