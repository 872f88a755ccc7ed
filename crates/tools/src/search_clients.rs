//! Client search by partial name or email.

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::{Tool, ToolOutcome};
use serde_json::{Value, json};

use crate::args::required_str;

const MAX_ROWS: usize = 20;

pub struct SearchClientsTool;

#[async_trait]
impl Tool for SearchClientsTool {
    fn name(&self) -> &str {
        "search_clients"
    }

    fn description(&self) -> &str {
        "Search the client list by partial name or email. Returns contact details and tags."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Part of the client's name or email"
                }
            },
            "required": ["query"]
        })
    }

    fn status_label(&self) -> &str {
        "Looking up clients..."
    }

    async fn execute(&self, input: Value, ctx: &TenantContext) -> Result<ToolOutcome, ToolError> {
        let query = required_str(&input, "query")?;
        let found = ctx.store.find_clients(&ctx.tenant_id, query).await?;
        let total = found.len();

        let clients: Vec<Value> = found
            .iter()
            .take(MAX_ROWS)
            .map(|c| {
                json!({
                    "name": c.name,
                    "email": c.email,
                    "phone": c.phone,
                    "tags": c.tags,
                })
            })
            .collect();

        Ok(ToolOutcome::Ok(json!({
            "clients": clients,
            "total": total,
            "truncated": total > MAX_ROWS,
        })))
    }
}
