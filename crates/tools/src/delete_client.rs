//! Permanently remove a client. Two-phase.

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::store::MessageLogEntry;
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::{Tool, ToolOutcome};
use serde_json::{Value, json};

use crate::args::{is_confirmed, required_str};
use crate::resolve::resolve_client;

pub struct DeleteClientTool;

#[async_trait]
impl Tool for DeleteClientTool {
    fn name(&self) -> &str {
        "delete_client"
    }

    fn description(&self) -> &str {
        "Permanently delete a client record. Call first without 'confirmed' to get a preview; call again with confirmed=true only after the user approves."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "client": {
                    "type": "string",
                    "description": "Client name, partial match"
                },
                "confirmed": {
                    "type": "boolean",
                    "description": "true only after the user approved the preview"
                }
            },
            "required": ["client"]
        })
    }

    fn status_label(&self) -> &str {
        "Removing client..."
    }

    async fn execute(&self, input: Value, ctx: &TenantContext) -> Result<ToolOutcome, ToolError> {
        let name = required_str(&input, "client")?;

        let client = match resolve_client(ctx, name).await?.into_unique(name) {
            Ok(client) => client,
            Err(outcome) => return Ok(outcome),
        };

        if !is_confirmed(&input) {
            return Ok(ToolOutcome::PendingConfirmation {
                action: self.name().to_string(),
                preview: json!({
                    "client": client.name,
                    "email": client.email,
                    "phone": client.phone,
                    "warning": "This permanently deletes the client record.",
                }),
            });
        }

        ctx.store.delete_client(&ctx.tenant_id, &client.id).await?;

        ctx.audit.submit(
            &ctx.tenant_id,
            MessageLogEntry::new(
                self.name(),
                &ctx.acting_user_id,
                format!("Deleted client {}", client.name),
            )
            .for_client(&client.id),
        );

        Ok(ToolOutcome::Ok(json!({
            "success": true,
            "deleted": client.name,
        })))
    }
}
