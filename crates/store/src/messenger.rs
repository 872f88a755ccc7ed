//! Messenger implementations.

use std::collections::HashSet;

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::outbound::{Messenger, OutboundMessage};
use tokio::sync::Mutex;
use tracing::info;

/// Logs each message instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), ToolError> {
        info!(
            tenant_id = %message.tenant_id,
            client_id = %message.client_id,
            channel = %message.channel,
            to = %message.to,
            chars = message.body.chars().count(),
            "Outbound message"
        );
        Ok(())
    }
}

/// Records every message it is asked to send. Addresses registered with
/// `fail_for` are rejected.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<OutboundMessage>>,
    failing: HashSet<String>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(mut self, address: impl Into<String>) -> Self {
        self.failing.insert(address.into());
        self
    }

    pub async fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), ToolError> {
        if self.failing.contains(&message.to) {
            return Err(ToolError::Delivery(format!("{} rejected", message.to)));
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}
