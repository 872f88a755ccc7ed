//! Change a product's price. Two-phase: preview first, then confirmed write.

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::store::MessageLogEntry;
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::{Tool, ToolOutcome};
use serde_json::{Value, json};

use crate::args::{format_cents, is_confirmed, money_cents, required_str};
use crate::resolve::resolve_product;

pub struct UpdatePriceTool;

#[async_trait]
impl Tool for UpdatePriceTool {
    fn name(&self) -> &str {
        "update_price"
    }

    fn description(&self) -> &str {
        "Set a product's price. Call first without 'confirmed' to get a preview; call again with confirmed=true only after the user approves."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product": {
                    "type": "string",
                    "description": "Product name or SKU, partial match"
                },
                "price": {
                    "type": "number",
                    "description": "New price in dollars"
                },
                "confirmed": {
                    "type": "boolean",
                    "description": "true only after the user approved the preview"
                }
            },
            "required": ["product", "price"]
        })
    }

    fn status_label(&self) -> &str {
        "Updating price..."
    }

    async fn execute(&self, input: Value, ctx: &TenantContext) -> Result<ToolOutcome, ToolError> {
        let name = required_str(&input, "product")?;
        let new_cents = money_cents(&input, "price")?;

        let product = match resolve_product(ctx, name).await?.into_unique(name) {
            Ok(product) => product,
            Err(outcome) => return Ok(outcome),
        };

        if !is_confirmed(&input) {
            return Ok(ToolOutcome::PendingConfirmation {
                action: self.name().to_string(),
                preview: json!({
                    "product": product.name,
                    "sku": product.sku,
                    "currentPrice": format_cents(product.price_cents),
                    "newPrice": format_cents(new_cents),
                }),
            });
        }

        ctx.store
            .set_product_price(&ctx.tenant_id, &product.id, new_cents)
            .await?;

        let change = format!(
            "{}: {} -> {}",
            product.name,
            format_cents(product.price_cents),
            format_cents(new_cents)
        );
        ctx.audit.submit(
            &ctx.tenant_id,
            MessageLogEntry::new(self.name(), &ctx.acting_user_id, change),
        );

        Ok(ToolOutcome::Ok(json!({
            "success": true,
            "product": product.name,
            "oldPrice": format_cents(product.price_cents),
            "newPrice": format_cents(new_cents),
        })))
    }
}
