//! Message every client, or every client with a tag. Two-phase.

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::outbound::OutboundMessage;
use bizpilot_core::store::MessageLogEntry;
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::{Tool, ToolOutcome};
use serde_json::{Value, json};
use tracing::warn;

use crate::args::{is_confirmed, optional_str, required_str};
use crate::send_message::{address_for, channel_arg};
use crate::template::{TemplateVars, render};

const PREVIEW_SAMPLE_SIZE: usize = 5;

pub struct BulkSendMessageTool;

#[async_trait]
impl Tool for BulkSendMessageTool {
    fn name(&self) -> &str {
        "bulk_send_message"
    }

    fn description(&self) -> &str {
        "Send the same message to many clients: all clients, or only those with a tag. Placeholders are filled per client. Call first without 'confirmed' to get a preview; call again with confirmed=true only after the user approves."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Message text, may contain placeholders"
                },
                "tag": {
                    "type": "string",
                    "description": "Only clients with this tag (e.g. vip)"
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
            "required": ["message"]
        })
    }

    fn status_label(&self) -> &str {
        "Preparing bulk message..."
    }

    async fn execute(&self, input: Value, ctx: &TenantContext) -> Result<ToolOutcome, ToolError> {
        let template = required_str(&input, "message")?;
        let tag = optional_str(&input, "tag");
        let channel = channel_arg(&input)?;

        let clients = ctx.store.list_clients(&ctx.tenant_id, tag).await?;
        let total = clients.len();
        let recipients: Vec<_> = clients
            .into_iter()
            .filter_map(|c| {
                let to = address_for(&c, channel)?.to_string();
                Some((c, to))
            })
            .collect();
        let skipped = total - recipients.len();

        let Some((first, _)) = recipients.first() else {
            return Ok(ToolOutcome::error(match tag {
                Some(tag) => format!("No clients tagged '{tag}' have a {channel} address"),
                None => format!("No clients have a {channel} address"),
            }));
        };

        let business = ctx.store.business_profile(&ctx.tenant_id).await?;

        if !is_confirmed(&input) {
            let sample: Vec<&str> = recipients
                .iter()
                .take(PREVIEW_SAMPLE_SIZE)
                .map(|(c, _)| c.name.as_str())
                .collect();
            return Ok(ToolOutcome::PendingConfirmation {
                action: self.name().to_string(),
                preview: json!({
                    "recipientCount": recipients.len(),
                    "sampleRecipients": sample,
                    "skippedNoAddress": skipped,
                    "channel": channel,
                    "tag": tag,
                    "firstMessage": render(template, &TemplateVars::for_client(first, business.as_ref())),
                }),
            });
        }

        let mut sent = 0usize;
        let mut failed = 0usize;
        for (client, to) in &recipients {
            let body = render(template, &TemplateVars::for_client(client, business.as_ref()));
            let message = OutboundMessage {
                tenant_id: ctx.tenant_id.clone(),
                client_id: client.id.clone(),
                channel,
                to: to.clone(),
                body: body.clone(),
            };
            match ctx.messenger.send(&message).await {
                Ok(()) => {
                    sent += 1;
                    ctx.audit.submit(
                        &ctx.tenant_id,
                        MessageLogEntry::new(self.name(), &ctx.acting_user_id, body)
                            .for_client(&client.id)
                            .via(channel.as_str()),
                    );
                }
                Err(e) => {
                    failed += 1;
                    warn!(tenant_id = %ctx.tenant_id, client_id = %client.id, error = %e, "Bulk message delivery failed");
                }
            }
        }

        Ok(ToolOutcome::Ok(json!({
            "success": true,
            "sent": sent,
            "failed": failed,
            "skippedNoAddress": skipped,
        })))
    }
}
