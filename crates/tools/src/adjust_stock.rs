//! Set or adjust a product's stock count. Applied directly once the name is
//! unambiguous.

use async_trait::async_trait;
use bizpilot_core::error::ToolError;
use bizpilot_core::store::MessageLogEntry;
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::{Tool, ToolOutcome};
use serde_json::{Value, json};

use crate::args::{optional_i64, required_str};
use crate::resolve::resolve_product;

pub struct AdjustStockTool;

#[async_trait]
impl Tool for AdjustStockTool {
    fn name(&self) -> &str {
        "adjust_stock"
    }

    fn description(&self) -> &str {
        "Change a product's stock count: either set an absolute 'quantity' or apply a 'delta' (e.g. -2 after a sale, 10 after a delivery)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "product": {
                    "type": "string",
                    "description": "Product name or SKU, partial match"
                },
                "quantity": {
                    "type": "integer",
                    "description": "New absolute stock count"
                },
                "delta": {
                    "type": "integer",
                    "description": "Amount to add (positive) or remove (negative)"
                }
            },
            "required": ["product"]
        })
    }

    fn status_label(&self) -> &str {
        "Adjusting stock..."
    }

    async fn execute(&self, input: Value, ctx: &TenantContext) -> Result<ToolOutcome, ToolError> {
        let name = required_str(&input, "product")?;
        let quantity = optional_i64(&input, "quantity")?;
        let delta = optional_i64(&input, "delta")?;

        match (quantity, delta) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(ToolError::InvalidArguments(
                    "Provide exactly one of 'quantity' or 'delta'".into(),
                ));
            }
            (Some(q), None) if q < 0 => {
                return Err(ToolError::InvalidArguments(
                    "'quantity' cannot be negative".into(),
                ));
            }
            _ => {}
        }

        let product = match resolve_product(ctx, name).await?.into_unique(name) {
            Ok(product) => product,
            Err(outcome) => return Ok(outcome),
        };

        let new_stock = match (quantity, delta) {
            (Some(q), _) => q,
            (None, Some(d)) => product.stock.saturating_add(d),
            (None, None) => product.stock,
        };
        if new_stock < 0 {
            return Ok(ToolOutcome::error(format!(
                "Cannot remove {} from {}: only {} in stock",
                delta.unwrap_or_default().unsigned_abs(),
                product.name,
                product.stock
            )));
        }

        ctx.store
            .set_product_stock(&ctx.tenant_id, &product.id, new_stock)
            .await?;

        ctx.audit.submit(
            &ctx.tenant_id,
            MessageLogEntry::new(
                self.name(),
                &ctx.acting_user_id,
                format!("{}: stock {} -> {}", product.name, product.stock, new_stock),
            ),
        );

        Ok(ToolOutcome::Ok(json!({
            "success": true,
            "product": product.name,
            "previousStock": product.stock,
            "stock": new_stock,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::harness;

    #[tokio::test]
    async fn delta_applies_to_current_stock() {
        let h = harness().await;
        let outcome = AdjustStockTool
            .execute(json!({"product": "juniper", "delta": 10}), &h.ctx)
            .await
            .unwrap();
        let ToolOutcome::Ok(value) = outcome else {
            panic!("expected ok");
        };
        assert_eq!(value["previousStock"], 2);
        assert_eq!(value["stock"], 12);
        assert_eq!(h.store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn stock_never_goes_negative() {
        let h = harness().await;
        let outcome = AdjustStockTool
            .execute(json!({"product": "juniper", "delta": -3}), &h.ctx)
            .await
            .unwrap();
        assert!(outcome.is_error());
        assert_eq!(h.store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn ambiguous_name_changes_nothing() {
        let h = harness().await;
        let outcome = AdjustStockTool
            .execute(json!({"product": "aspen", "quantity": 1}), &h.ctx)
            .await
            .unwrap();
        assert!(matches!(outcome, ToolOutcome::NeedsClarification { .. }));
        assert_eq!(h.store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn needs_exactly_one_of_quantity_or_delta() {
        let h = harness().await;
        for input in [
            json!({"product": "juniper"}),
            json!({"product": "juniper", "quantity": 1, "delta": 1}),
        ] {
            let result = AdjustStockTool.execute(input, &h.ctx).await;
            assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
        }
    }
}
