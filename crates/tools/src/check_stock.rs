//! Inventory lookup: one product by name, or everything running low.

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::{Tool, ToolOutcome};
use serde_json::{Value, json};

use crate::args::{format_cents, optional_i64, optional_str};

const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

pub struct CheckStockTool;

#[async_trait]
impl Tool for CheckStockTool {
    fn name(&self) -> &str {
        "check_stock"
    }

    fn description(&self) -> &str {
        "Check inventory. With a product name (partial match), returns stock and price for every matching product. Without one, lists products at or below the low-stock threshold."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product": {
                    "type": "string",
                    "description": "Product name or SKU, partial match"
                },
                "threshold": {
                    "type": "integer",
                    "description": "Low-stock threshold when no product is given (default 5)"
                }
            }
        })
    }

    fn status_label(&self) -> &str {
        "Checking inventory..."
    }

    async fn execute(&self, input: Value, ctx: &TenantContext) -> Result<ToolOutcome, ToolError> {
        let products = match optional_str(&input, "product") {
            Some(name) => {
                let found = ctx.store.find_products(&ctx.tenant_id, name).await?;
                if found.is_empty() {
                    return Ok(ToolOutcome::error(format!("product not found: '{name}'")));
                }
                found
            }
            None => {
                let threshold =
                    optional_i64(&input, "threshold")?.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
                let low = ctx
                    .store
                    .products_at_or_below(&ctx.tenant_id, threshold)
                    .await?;
                if low.is_empty() {
                    return Ok(ToolOutcome::Ok(json!({
                        "products": [],
                        "message": format!("No products at or below {threshold} in stock"),
                    })));
                }
                low
            }
        };

        let rows: Vec<Value> = products
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "sku": p.sku,
                    "stock": p.stock,
                    "price": format_cents(p.price_cents),
                })
            })
            .collect();

        Ok(ToolOutcome::Ok(json!({ "products": rows })))
    }
}
