//! Owner Alert Sink
//!
//! Operational and moderation notices are always logged, and forwarded to
//! the owner as a private message when an owner is configured.

use crate::config::Owner;
use crate::transport::Transport;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AlertSink {
    owner: Owner,
    transport: Arc<dyn Transport>,
}

impl AlertSink {
    pub fn new(owner: Owner, transport: Arc<dyn Transport>) -> Self {
        Self { owner, transport }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Log `message` and forward it to the owner.
    ///
    /// Delivery failures are logged and dropped.
    pub async fn notify(&self, message: &str) {
        info!("Alert: {}", message);

        if let Some(owner) = self.owner.handle() {
            if let Err(e) = self.transport.send_private_message(owner, message).await {
                warn!("Failed to alert owner @{}: {}", owner, e);
            }
        }
    }
}
