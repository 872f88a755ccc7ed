//! Outbound messaging, the external-facing side effect of messaging tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tenant::TenantId;

/// Delivery channel for a client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Sms,
    Email,
}

impl DeliveryChannel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sms" | "text" => Some(Self::Sms),
            "email" | "e-mail" => Some(Self::Email),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub tenant_id: TenantId,
    pub client_id: String,
    pub channel: DeliveryChannel,
    /// Phone number or email address
    pub to: String,
    pub body: String,
}

/// Something that can deliver a message to a client.
#[async_trait]
pub trait Messenger: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &OutboundMessage) -> Result<(), ToolError>;
}
