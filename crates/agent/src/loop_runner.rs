//! The agentic loop: call the model, run the tools it asks for, feed the
//! results back, repeat until it answers or the iteration cap is hit.

use std::sync::Arc;

use bizpilot_config::AppConfig;
use bizpilot_core::error::ProviderError;
use bizpilot_core::message::{ContentBlock, Message, Transcript};
use bizpilot_core::provider::{CompletionRequest, Provider, Usage};
use bizpilot_core::tool::{ToolExecutor, ToolInvocation, ToolOutcome};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Returned instead of an answer when the model keeps asking for tools.
pub const ITERATION_FALLBACK_TEXT: &str = "I'm sorry, I wasn't able to finish that in the steps I'm allowed. Could you try again, or break the request into smaller parts?";

pub const DEFAULT_MAX_ITERATIONS: usize = 6;
pub const DEFAULT_MAX_TOOLS_PER_TURN: usize = 8;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// What one run of the loop produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopResult {
    /// The model's final prose, or the fallback text.
    pub final_text: String,

    /// One status label per executed tool invocation, in execution order.
    pub tool_status_events: Vec<String>,

    /// Completion calls made.
    pub iterations: usize,

    /// Whether the run ended at the iteration cap.
    pub hit_iteration_cap: bool,

    /// Token usage summed over every completion call.
    pub usage: Usage,
}

/// The core agent loop that orchestrates completion calls and tool execution.
pub struct AgentLoop {
    /// The completion service
    provider: Arc<dyn Provider>,

    /// The model to request
    model: String,

    /// Max tokens per completion
    max_tokens: u32,

    /// Completion calls allowed per run
    max_iterations: usize,

    /// Tool invocations executed per model turn; the rest get an error result
    max_tools_per_turn: usize,

    /// Run one turn's invocations concurrently
    parallel_tool_calls: bool,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tools_per_turn: DEFAULT_MAX_TOOLS_PER_TURN,
            parallel_tool_calls: false,
        }
    }

    /// Build a loop from the `[provider]` and `[agent]` config sections.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, config.provider.model.clone())
            .with_max_tokens(config.provider.max_tokens)
            .with_max_iterations(config.agent.max_iterations)
            .with_max_tools_per_turn(config.agent.max_tools_per_turn)
            .with_parallel_tool_calls(config.agent.parallel_tool_calls)
    }

    /// Set the maximum number of completion calls per run.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_max_tools_per_turn(mut self, max: usize) -> Self {
        self.max_tools_per_turn = max.max(1);
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Drive the conversation to a final answer.
    ///
    /// Only a completion-service failure is returned as `Err`. Tool failures
    /// are fed back to the model, and running out of iterations yields
    /// [`ITERATION_FALLBACK_TEXT`].
    pub async fn run(
        &self,
        system: &str,
        transcript: Transcript,
        tools: &dyn ToolExecutor,
    ) -> Result<LoopResult, ProviderError> {
        let definitions = tools.definitions();
        let mut transcript = transcript;
        let mut result = LoopResult::default();

        info!(
            provider = self.provider.name(),
            messages = transcript.len(),
            tools = definitions.len(),
            "Running agent loop"
        );

        while result.iterations < self.max_iterations {
            result.iterations += 1;
            debug!(iteration = result.iterations, "Agent loop iteration");

            let request = CompletionRequest {
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                system: system.to_string(),
                messages: transcript.messages().to_vec(),
                tools: definitions.clone(),
                stream: false,
            };

            let response = self.provider.complete(request).await?;
            if let Some(usage) = response.usage {
                result.usage.input_tokens += usage.input_tokens;
                result.usage.output_tokens += usage.output_tokens;
            }

            let invocations = response.tool_invocations();
            if !response.wants_tools() || invocations.is_empty() {
                debug!(
                    iteration = result.iterations,
                    stop_reason = ?response.stop_reason,
                    "Model finished"
                );
                result.final_text = response.text();
                return Ok(result);
            }

            debug!(
                iteration = result.iterations,
                tool_count = invocations.len(),
                "Executing tool calls"
            );

            transcript = transcript.with(Message::assistant_blocks(response.content));
            let results = self
                .execute_turn(&invocations, tools, &mut result.tool_status_events)
                .await;
            transcript = transcript.with(Message::tool_results(results));
        }

        warn!(
            iterations = result.iterations,
            "Max tool iterations reached, returning fallback text"
        );
        result.final_text = ITERATION_FALLBACK_TEXT.to_string();
        result.hit_iteration_cap = true;
        Ok(result)
    }

    /// Execute one turn's invocations and return their result blocks in
    /// request order.
    async fn execute_turn(
        &self,
        invocations: &[ToolInvocation],
        tools: &dyn ToolExecutor,
        status_events: &mut Vec<String>,
    ) -> Vec<ContentBlock> {
        let cap = self.max_tools_per_turn.min(invocations.len());
        let (run, skipped) = invocations.split_at(cap);
        if !skipped.is_empty() {
            warn!(
                requested = invocations.len(),
                cap = self.max_tools_per_turn,
                "Too many tool calls in one turn, skipping the rest"
            );
        }

        let outcomes: Vec<ToolOutcome> = if self.parallel_tool_calls {
            status_events.extend(run.iter().map(|inv| tools.status_label(&inv.name)));
            join_all(run.iter().map(|inv| tools.execute(inv))).await
        } else {
            let mut outcomes = Vec::with_capacity(run.len());
            for inv in run {
                status_events.push(tools.status_label(&inv.name));
                outcomes.push(tools.execute(inv).await);
            }
            outcomes
        };

        let skipped_outcome = || {
            ToolOutcome::error(format!(
                "Not executed: at most {} tool calls are allowed per turn. Request it again if it is still needed.",
                self.max_tools_per_turn
            ))
        };

        run.iter()
            .zip(outcomes)
            .chain(skipped.iter().map(|inv| (inv, skipped_outcome())))
            .map(|(inv, outcome)| {
                let envelope = outcome.into_envelope();
                ContentBlock::ToolResult {
                    tool_use_id: inv.id.clone(),
                    content: envelope.result,
                    is_error: envelope.is_error,
                }
            })
            .collect()
    }
}
