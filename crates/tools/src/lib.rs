//! Built-in business tools for BizPilot.
//!
//! Tools give the assistant the ability to act on one tenant's data:
//! check inventory, look up clients and the calendar, change prices and
//! stock, create events, and message clients.
//!
//! Handlers that change data or reach outside the system are two-phase:
//! without `confirmed: true` they only return a preview. Handlers that take
//! a free-text name resolve it first and ask for clarification instead of
//! guessing when it matches more than one record.

pub mod adjust_stock;
pub mod args;
pub mod bulk_send_message;
pub mod check_stock;
pub mod create_event;
pub mod delete_client;
pub mod list_upcoming_events;
pub mod resolve;
pub mod search_clients;
pub mod send_message;
pub mod template;
pub mod update_price;

use bizpilot_core::error::ToolError;
use bizpilot_core::tool::ToolRegistry;

/// Create a registry with every built-in tool.
pub fn default_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(check_stock::CheckStockTool))?;
    registry.register(Box::new(search_clients::SearchClientsTool))?;
    registry.register(Box::new(list_upcoming_events::ListUpcomingEventsTool))?;
    registry.register(Box::new(update_price::UpdatePriceTool))?;
    registry.register(Box::new(adjust_stock::AdjustStockTool))?;
    registry.register(Box::new(create_event::CreateEventTool))?;
    registry.register(Box::new(send_message::SendMessageTool))?;
    registry.register(Box::new(bulk_send_message::BulkSendMessageTool))?;
    registry.register(Box::new(delete_client::DeleteClientTool))?;
    Ok(registry)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::harness;
    use bizpilot_core::tool::ToolOutcome;
    use serde_json::{Value, json};

    const MUTATING: &[&str] = &[
        "update_price",
        "send_message",
        "bulk_send_message",
        "delete_client",
    ];

    #[test]
    fn registers_every_tool_once() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), 9);
        for def in registry.definitions() {
            assert!(!def.description.is_empty(), "{} lacks a description", def.name);
            assert_eq!(def.input_schema["type"], "object");
        }
        for name in MUTATING {
            let def = registry
                .definitions()
                .into_iter()
                .find(|d| d.name == *name)
                .unwrap();
            assert!(
                def.input_schema["properties"].get("confirmed").is_some(),
                "{name} must accept 'confirmed'"
            );
        }
    }

    #[test]
    fn every_tool_has_its_own_status_label() {
        let registry = default_registry().unwrap();
        for name in registry.names() {
            assert_ne!(
                registry.status_label(name),
                bizpilot_core::tool::FALLBACK_STATUS_LABEL,
                "{name}"
            );
        }
    }

    #[tokio::test]
    async fn dispatch_is_total_for_junk_input() {
        let h = harness().await;
        let registry = default_registry().unwrap();
        let junk = [
            json!(null),
            json!({}),
            json!([1, 2, 3]),
            json!("text"),
            json!({"product": 42, "client": [], "price": "free", "confirmed": "yes"}),
        ];
        let names: Vec<String> = registry.names().iter().map(|s| s.to_string()).collect();
        for name in names.iter().map(String::as_str).chain(["no_such_tool"]) {
            for input in &junk {
                let envelope = registry
                    .execute(name, input.clone(), &h.ctx)
                    .await
                    .into_envelope();
                if envelope.is_error {
                    assert!(envelope.result["error"].is_string(), "{name} {input}");
                }
            }
        }
        assert_eq!(h.store.mutation_count(), 0);
        assert!(h.messenger.sent().await.is_empty());
    }

    #[tokio::test]
    async fn unconfirmed_mutations_have_no_side_effects() {
        let h = harness().await;
        let registry = default_registry().unwrap();
        let calls = [
            ("update_price", json!({"product": "cedar", "price": 99})),
            ("send_message", json!({"client": "priya", "message": "hi"})),
            ("bulk_send_message", json!({"message": "hi all"})),
            ("delete_client", json!({"client": "okafor"})),
            // anything but the literal `true` is not a confirmation
            (
                "delete_client",
                json!({"client": "okafor", "confirmed": "true"}),
            ),
        ];
        for (name, input) in calls {
            let outcome = registry.execute(name, input, &h.ctx).await;
            assert!(
                matches!(outcome, ToolOutcome::PendingConfirmation { .. }),
                "{name} returned {outcome:?}"
            );
            let envelope = outcome.into_envelope();
            assert!(!envelope.is_error);
            assert_eq!(envelope.result["pendingConfirmation"], true);
        }
        h.ctx.audit.flush().await;
        assert_eq!(h.store.mutation_count(), 0);
        assert!(h.messenger.sent().await.is_empty());
        assert!(h.store.message_log(&h.ctx.tenant_id).await.is_empty());
    }

    #[tokio::test]
    async fn ambiguous_names_clarify_regardless_of_confirmation() {
        let h = harness().await;
        let registry = default_registry().unwrap();
        let calls = [
            ("update_price", json!({"product": "aspen", "price": 12})),
            ("adjust_stock", json!({"product": "aspen", "delta": 1})),
            ("send_message", json!({"client": "maria", "message": "hi"})),
            ("delete_client", json!({"client": "maria"})),
            (
                "create_event",
                json!({"title": "x", "starts_at": "2030-01-01T09:00:00Z", "client": "maria"}),
            ),
        ];
        for (name, mut input) in calls {
            for confirmed in [Value::Null, json!(false), json!(true)] {
                input["confirmed"] = confirmed;
                let envelope = registry
                    .execute(name, input.clone(), &h.ctx)
                    .await
                    .into_envelope();
                assert!(!envelope.is_error, "{name}");
                assert_eq!(envelope.result["needsClarification"], true, "{name}");
                assert_eq!(envelope.result["matches"].as_array().unwrap().len(), 2);
            }
        }
        assert_eq!(h.store.mutation_count(), 0);
        assert!(h.messenger.sent().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_names_report_not_found() {
        let h = harness().await;
        let registry = default_registry().unwrap();
        let envelope = registry
            .execute(
                "update_price",
                json!({"product": "tiara", "price": 10, "confirmed": true}),
                &h.ctx,
            )
            .await
            .into_envelope();
        assert!(envelope.is_error);
        assert_eq!(envelope.result["error"], "product not found: 'tiara'");
    }

    #[tokio::test]
    async fn aspen_chain_price_change_is_two_phase() {
        let h = harness().await;
        let registry = default_registry().unwrap();
        let tenant = h.ctx.tenant_id.clone();

        let preview = registry
            .execute(
                "update_price",
                json!({"product": "Aspen chain necklace", "price": "$12"}),
                &h.ctx,
            )
            .await
            .into_envelope();
        assert!(!preview.is_error);
        assert_eq!(preview.result["pendingConfirmation"], true);
        assert_eq!(preview.result["preview"]["newPrice"], "$12.00");
        assert_eq!(h.store.mutation_count(), 0);

        let done = registry
            .execute(
                "update_price",
                json!({"product": "Aspen chain necklace", "price": "$12", "confirmed": true}),
                &h.ctx,
            )
            .await
            .into_envelope();
        assert!(!done.is_error);
        assert_eq!(done.result["success"], true);
        assert_eq!(h.store.mutation_count(), 1);
        let product = h
            .store
            .product(&tenant, "t1-aspen-necklace")
            .await
            .unwrap();
        assert_eq!(product.price_cents, 1_200);
    }
}
