//! Shared test helpers for agent tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bizpilot_core::error::ProviderError;
use bizpilot_core::message::ContentBlock;
use bizpilot_core::provider::{CompletionRequest, CompletionResponse, Provider, StopReason, Usage};
use bizpilot_core::tool::{ToolDefinition, ToolExecutor, ToolInvocation, ToolOutcome};
use serde_json::{Value, json};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue. A
/// repeating provider answers every call with the same response. Panics if
/// the script runs out.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    repeat: Option<CompletionResponse>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    pub fn from_results(results: Vec<Result<CompletionResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(response: CompletionResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.repeat {
            Some(response) => Ok(response.clone()),
            None => panic!("ScriptedProvider: no more responses (call #{call})"),
        }
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        input_tokens: 10,
        output_tokens: 5,
    })
}

/// A final answer.
pub fn text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        id: "msg_text".into(),
        model: "mock-model".into(),
        stop_reason: StopReason::EndTurn,
        content: vec![ContentBlock::text(text)],
        usage: usage(),
    }
}

/// A turn that stops to use tools.
pub fn tool_response(content: Vec<ContentBlock>) -> CompletionResponse {
    CompletionResponse {
        id: "msg_tools".into(),
        model: "mock-model".into(),
        stop_reason: StopReason::ToolUse,
        content,
        usage: usage(),
    }
}

pub fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.into(),
        name: name.into(),
        input,
    }
}

/// A tool executor that records what it was asked to run.
///
/// `fail` returns an error outcome, `sleep` waits `input.ms` milliseconds,
/// anything else echoes its input.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    /// Tool names in the order execution started.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocation ids in the order execution finished.
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for RecordingExecutor {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "check_stock".into(),
            description: "Check inventory".into(),
            input_schema: json!({"type": "object", "properties": {}}),
        }]
    }

    fn status_label(&self, name: &str) -> String {
        format!("Running {name}...")
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        self.calls.lock().unwrap().push(invocation.name.clone());
        let outcome = match invocation.name.as_str() {
            "fail" => ToolOutcome::error("fail exploded"),
            "sleep" => {
                let ms = invocation.input["ms"].as_u64().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                ToolOutcome::Ok(json!({"slept": ms}))
            }
            _ => ToolOutcome::Ok(invocation.input.clone()),
        };
        self.finished.lock().unwrap().push(invocation.id.clone());
        outcome
    }
}
