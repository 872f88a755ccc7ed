//! Create a calendar event, optionally attached to a client.

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::store::{MessageLogEntry, NewEvent};
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::{Tool, ToolOutcome};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::args::{optional_i64, optional_str, required_str};
use crate::resolve::resolve_client;

const DEFAULT_DURATION_MINUTES: i64 = 60;
const MAX_DURATION_MINUTES: i64 = 24 * 60;

pub struct CreateEventTool;

#[async_trait]
impl Tool for CreateEventTool {
    fn name(&self) -> &str {
        "create_event"
    }

    fn description(&self) -> &str {
        "Create a calendar event (appointment, fitting, pickup). Optionally link it to a client by name."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "starts_at": {
                    "type": "string",
                    "description": "Start time, RFC 3339 (e.g. 2025-03-14T15:00:00-05:00)"
                },
                "duration_minutes": {
                    "type": "integer",
                    "description": "Length in minutes (default 60)"
                },
                "client": {
                    "type": "string",
                    "description": "Client name, partial match"
                },
                "notes": { "type": "string" }
            },
            "required": ["title", "starts_at"]
        })
    }

    fn status_label(&self) -> &str {
        "Creating event..."
    }

    async fn execute(&self, input: Value, ctx: &TenantContext) -> Result<ToolOutcome, ToolError> {
        let title = required_str(&input, "title")?;
        let starts_at = required_str(&input, "starts_at")?;
        let starts_at = DateTime::parse_from_rfc3339(starts_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                ToolError::InvalidArguments(format!("'starts_at' must be RFC 3339: {e}"))
            })?;
        let duration_minutes =
            optional_i64(&input, "duration_minutes")?.unwrap_or(DEFAULT_DURATION_MINUTES);
        if !(1..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
            return Err(ToolError::InvalidArguments(format!(
                "'duration_minutes' must be between 1 and {MAX_DURATION_MINUTES}"
            )));
        }

        let client = match optional_str(&input, "client") {
            Some(name) => match resolve_client(ctx, name).await?.into_unique(name) {
                Ok(client) => Some(client),
                Err(outcome) => return Ok(outcome),
            },
            None => None,
        };

        let event = ctx
            .store
            .insert_event(
                &ctx.tenant_id,
                NewEvent {
                    title: title.to_string(),
                    client_id: client.as_ref().map(|c| c.id.clone()),
                    starts_at,
                    duration_minutes,
                    notes: optional_str(&input, "notes").map(str::to_string),
                    created_by: ctx.acting_user_id.clone(),
                },
            )
            .await?;

        let mut entry = MessageLogEntry::new(
            self.name(),
            &ctx.acting_user_id,
            format!("{} at {}", event.title, event.starts_at.to_rfc3339()),
        );
        if let Some(client) = &client {
            entry = entry.for_client(&client.id);
        }
        ctx.audit.submit(&ctx.tenant_id, entry);

        Ok(ToolOutcome::Ok(json!({
            "success": true,
            "event": {
                "id": event.id,
                "title": event.title,
                "startsAt": event.starts_at.to_rfc3339(),
                "durationMinutes": event.duration_minutes,
                "client": client.map(|c| c.name),
            }
        })))
    }
}
