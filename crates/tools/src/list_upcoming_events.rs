//! Calendar lookup for the next few days.

use std::collections::HashMap;

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::{Tool, ToolOutcome};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use crate::args::optional_i64;

const DEFAULT_DAYS: i64 = 7;
const MAX_DAYS: i64 = 90;

pub struct ListUpcomingEventsTool;

#[async_trait]
impl Tool for ListUpcomingEventsTool {
    fn name(&self) -> &str {
        "list_upcoming_events"
    }

    fn description(&self) -> &str {
        "List calendar events starting within the next N days (default 7, max 90), earliest first."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "days": {
                    "type": "integer",
                    "description": "How many days ahead to look (1-90)"
                }
            }
        })
    }

    fn status_label(&self) -> &str {
        "Checking the calendar..."
    }

    async fn execute(&self, input: Value, ctx: &TenantContext) -> Result<ToolOutcome, ToolError> {
        let days = optional_i64(&input, "days")?
            .unwrap_or(DEFAULT_DAYS)
            .clamp(1, MAX_DAYS);
        let now = Utc::now();
        let events = ctx
            .store
            .events_between(&ctx.tenant_id, now, now + Duration::days(days))
            .await?;

        let names: HashMap<String, String> = if events.iter().any(|e| e.client_id.is_some()) {
            ctx.store
                .list_clients(&ctx.tenant_id, None)
                .await?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect()
        } else {
            HashMap::new()
        };

        let rows: Vec<Value> = events
            .iter()
            .map(|e| {
                json!({
                    "title": e.title,
                    "startsAt": e.starts_at.to_rfc3339(),
                    "durationMinutes": e.duration_minutes,
                    "client": e.client_id.as_ref().and_then(|id| names.get(id)),
                    "notes": e.notes,
                })
            })
            .collect();

        Ok(ToolOutcome::Ok(json!({
            "days": days,
            "events": rows,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::harness;
    use bizpilot_core::store::{BusinessStore, NewEvent};

    #[tokio::test]
    async fn window_is_clamped_and_client_named() {
        let h = harness().await;
        let tenant = h.ctx.tenant_id.clone();
        let client_id = format!("{tenant}-maria-lopez");
        for (offset, client) in [(2, Some(client_id.clone())), (120, None)] {
            h.store
                .insert_event(
                    &tenant,
                    NewEvent {
                        title: format!("Event in {offset}d"),
                        client_id: client,
                        starts_at: Utc::now() + Duration::days(offset),
                        duration_minutes: 30,
                        notes: None,
                        created_by: "u1".into(),
                    },
                )
                .await
                .unwrap();
        }

        let outcome = ListUpcomingEventsTool
            .execute(json!({"days": 365}), &h.ctx)
            .await
            .unwrap();
        let ToolOutcome::Ok(value) = outcome else {
            panic!("expected ok");
        };
        assert_eq!(value["days"], MAX_DAYS);
        let events = value["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["client"], "Maria Lopez");
    }
}
