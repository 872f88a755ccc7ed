//! The assistant orchestrator for BizPilot.
//!
//! One chat request flows through here:
//!
//! 1. **Select knowledge** for the recent user text ([`KnowledgeSelector`])
//! 2. **Build the system prompt** ([`SystemPrompt`])
//! 3. **Run the loop** ([`AgentLoop`]): call the model, execute the tools it
//!    asks for, feed the results back, until it answers or hits the cap
//! 4. **Replay the result** as paced events ([`SimulatedStream`])

pub mod knowledge;
pub mod loop_runner;
pub mod prompt;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use knowledge::{
    CATALOG_VERSION, KnowledgeCatalog, KnowledgeError, KnowledgeFragment, KnowledgeSelector,
    Selection,
};
pub use loop_runner::{AgentLoop, ITERATION_FALLBACK_TEXT, LoopResult};
pub use prompt::SystemPrompt;
pub use stream_event::{SimulatedStream, StreamEvent};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bizpilot_core::audit::AuditQueue;
    use bizpilot_core::message::{ContentBlock, Message, MessageContent, Transcript};
    use bizpilot_core::tenant::{TenantContext, TenantId};
    use bizpilot_core::tool::TenantToolbox;
    use bizpilot_store::{InMemoryStore, RecordingMessenger};
    use serde_json::json;

    use super::*;
    use crate::test_helpers::{ScriptedProvider, text_response, tool_response, tool_use};

    async fn toolbox() -> (Arc<InMemoryStore>, TenantToolbox) {
        let tenant = TenantId::new("t1");
        let store = Arc::new(InMemoryStore::with_demo(&tenant).await);
        let ctx = TenantContext::new(
            tenant,
            "u1",
            store.clone(),
            Arc::new(RecordingMessenger::new()),
            AuditQueue::spawn(store.clone()),
        );
        let registry = Arc::new(bizpilot_tools::default_registry().unwrap());
        (store, TenantToolbox::new(registry, ctx))
    }

    fn first_tool_result(request: &bizpilot_core::provider::CompletionRequest) -> serde_json::Value {
        let MessageContent::Blocks(blocks) = &request.messages.last().unwrap().content else {
            panic!("expected tool results");
        };
        match &blocks[0] {
            ContentBlock::ToolResult { content, .. } => content.clone(),
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[tokio::test]
    async fn price_change_needs_a_second_confirmed_turn() {
        let (store, toolbox) = toolbox().await;
        let input = json!({"product": "aspen chain necklace", "price": "$12"});

        // First request: the model previews the change and asks the user.
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(vec![tool_use("toolu_1", "update_price", input.clone())]),
            text_response("This will change Aspen Chain Necklace from $89.00 to $12.00. Go ahead?"),
        ]));
        let agent = AgentLoop::new(provider.clone(), "mock-model");
        let transcript =
            Transcript::default().with(Message::user("set the price of Aspen chain necklace to $12"));
        let result = agent.run("system", transcript.clone(), &toolbox).await.unwrap();

        assert_eq!(result.tool_status_events, vec!["Updating price..."]);
        assert_eq!(first_tool_result(&provider.requests()[1])["pendingConfirmation"], true);
        assert_eq!(store.mutation_count(), 0);

        // Second request: the user said yes, the model confirms.
        let mut confirmed = input;
        confirmed["confirmed"] = json!(true);
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(vec![tool_use("toolu_2", "update_price", confirmed)]),
            text_response("Done, it's now $12.00."),
        ]));
        let agent = AgentLoop::new(provider.clone(), "mock-model");
        let transcript = transcript
            .with(Message::assistant(result.final_text))
            .with(Message::user("yes"));
        let result = agent.run("system", transcript, &toolbox).await.unwrap();

        assert_eq!(result.final_text, "Done, it's now $12.00.");
        assert_eq!(first_tool_result(&provider.requests()[1])["success"], true);
        assert_eq!(store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_fed_back_as_error() {
        let (_store, toolbox) = toolbox().await;
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(vec![tool_use("toolu_1", "launch_rocket", json!({}))]),
            text_response("I can't do that."),
        ]));
        let agent = AgentLoop::new(provider.clone(), "mock-model");
        let result = agent
            .run("system", Transcript::default().with(Message::user("launch")), &toolbox)
            .await
            .unwrap();

        assert_eq!(result.tool_status_events, vec!["Working on it..."]);
        assert_eq!(
            first_tool_result(&provider.requests()[1])["error"],
            "Unknown tool: launch_rocket"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn loop_result_streams_in_order() {
        let (_store, toolbox) = toolbox().await;
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(vec![tool_use("toolu_1", "check_stock", json!({}))]),
            text_response("Juniper Hoop Earrings and Willow Pendant are low."),
        ]));
        let agent = AgentLoop::new(provider, "mock-model");
        let result = agent
            .run("system", Transcript::default().with(Message::user("what's low?")), &toolbox)
            .await
            .unwrap();

        let final_text = result.final_text.clone();
        let mut rx = SimulatedStream::from_result(result).emit();
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events[0], StreamEvent::ToolStatus("Checking inventory...".into()));
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextChunk(c) => Some(c.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, final_text);
        assert!(events.last().unwrap().is_done());
    }
}
