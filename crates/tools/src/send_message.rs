//! Message one client by SMS or email. Two-phase.

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::outbound::{DeliveryChannel, OutboundMessage};
use bizpilot_core::store::{Client, MessageLogEntry};
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::{Tool, ToolOutcome};
use serde_json::{Value, json};

use crate::args::{is_confirmed, optional_str, required_str};
use crate::resolve::resolve_client;
use crate::template::{TemplateVars, render};

/// Parse the `channel` argument, defaulting to SMS.
pub(crate) fn channel_arg(input: &Value) -> Result<DeliveryChannel, ToolError> {
    match optional_str(input, "channel") {
        None => Ok(DeliveryChannel::Sms),
        Some(raw) => DeliveryChannel::parse(raw).ok_or_else(|| {
            ToolError::InvalidArguments(format!("Unknown channel '{raw}', use 'sms' or 'email'"))
        }),
    }
}

/// The client's address on `channel`, if they have one.
pub(crate) fn address_for(client: &Client, channel: DeliveryChannel) -> Option<&str> {
    match channel {
        DeliveryChannel::Sms => client.phone.as_deref(),
        DeliveryChannel::Email => client.email.as_deref(),
    }
}

pub struct SendMessageTool;

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a message to one client by SMS or email. Supports {{client_name}}, {{first_name}}, {{business_name}} and {{business_phone}}. Call first without 'confirmed' to get a preview; call again with confirmed=true only after the user approves."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "client": {
                    "type": "string",
                    "description": "Client name, partial match"
                },
                "message": {
                    "type": "string",
                    "description": "Message text, may contain placeholders"
                },
                "channel": {
                    "type": "string",
                    "enum": ["sms", "email"],
                    "description": "Delivery channel (default sms)"
                },
                "confirmed": {
                    "type": "boolean",
                    "description": "true only after the user approved the preview"
                }
            },
            "required": ["client", "message"]
        })
    }

    fn status_label(&self) -> &str {
        "Preparing message..."
    }

    async fn execute(&self, input: Value, ctx: &TenantContext) -> Result<ToolOutcome, ToolError> {
        let name = required_str(&input, "client")?;
        let template = required_str(&input, "message")?;
        let channel = channel_arg(&input)?;

        let client = match resolve_client(ctx, name).await?.into_unique(name) {
            Ok(client) => client,
            Err(outcome) => return Ok(outcome),
        };

        let Some(to) = address_for(&client, channel).map(str::to_string) else {
            return Ok(ToolOutcome::error(format!(
                "{} has no {} address on file",
                client.name, channel
            )));
        };

        let business = ctx.store.business_profile(&ctx.tenant_id).await?;
        let body = render(template, &TemplateVars::for_client(&client, business.as_ref()));

        if !is_confirmed(&input) {
            return Ok(ToolOutcome::PendingConfirmation {
                action: self.name().to_string(),
                preview: json!({
                    "recipient": client.name,
                    "channel": channel,
                    "to": to,
                    "message": body,
                }),
            });
        }

        ctx.messenger
            .send(&OutboundMessage {
                tenant_id: ctx.tenant_id.clone(),
                client_id: client.id.clone(),
                channel,
                to: to.clone(),
                body: body.clone(),
            })
            .await?;

        ctx.audit.submit(
            &ctx.tenant_id,
            MessageLogEntry::new(self.name(), &ctx.acting_user_id, body.clone())
                .for_client(&client.id)
                .via(channel.as_str()),
        );

        Ok(ToolOutcome::Ok(json!({
            "success": true,
            "recipient": client.name,
            "channel": channel,
            "message": body,
        })))
    }
}
