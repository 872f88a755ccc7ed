//! Tool trait, result envelope, and the registry that dispatches by name.
//!
//! Tools are what let the assistant act on a tenant's business data:
//! look up stock, message clients, create events. Every tool call ends in a
//! [`ToolOutcome`], whatever happens inside the handler.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::error::ToolError;
use crate::tenant::TenantContext;

/// A tool definition sent to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's input
    pub input_schema: Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Invocation id; the result must carry it back
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Input as a JSON value
    pub input: Value,
}

/// What a tool call produced.
///
/// Only `Error` is a failure. A pending confirmation or a clarification
/// request is a normal turn outcome the model must relay to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The call completed; the value is shown to the model as-is.
    Ok(Value),

    /// The call failed; the model sees the message and can adapt.
    Error(String),

    /// A mutating call arrived without `confirmed: true`. Nothing was changed.
    PendingConfirmation { action: String, preview: Value },

    /// A name matched several records. Nothing was changed.
    NeedsClarification { entity: String, matches: Vec<Value> },
}

impl ToolOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Encode as the uniform `{result, isError}` envelope.
    pub fn into_envelope(self) -> ToolResultEnvelope {
        let is_error = self.is_error();
        let result = match self {
            Self::Ok(value) => value,
            Self::Error(message) => json!({ "error": message }),
            Self::PendingConfirmation { action, preview } => json!({
                "pendingConfirmation": true,
                "action": action,
                "preview": preview,
                "instructions": "Nothing has been changed yet. Show this preview to the user and call the tool again with confirmed=true only after they explicitly agree.",
            }),
            Self::NeedsClarification { entity, matches } => json!({
                "needsClarification": true,
                "entity": entity,
                "matches": matches,
                "instructions": format!("More than one {entity} matches. Ask the user which one they mean; do not pick one yourself."),
            }),
        };
        ToolResultEnvelope { result, is_error }
    }
}

/// The uniform wire shape of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultEnvelope {
    pub result: Value,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

/// The core Tool trait.
///
/// Handlers may return `Err`; the registry turns it into an error outcome
/// before anything above it sees it. Every datastore call a handler makes
/// must be scoped by `ctx.tenant_id`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "check_stock").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's input.
    fn input_schema(&self) -> Value;

    /// Short status line shown to the user while the tool runs.
    fn status_label(&self) -> &str {
        "Working on it..."
    }

    /// Execute the tool on behalf of one tenant.
    async fn execute(
        &self,
        input: Value,
        ctx: &TenantContext,
    ) -> std::result::Result<ToolOutcome, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Status label used for names no registered tool answers to.
pub const FALLBACK_STATUS_LABEL: &str = "Working on it...";

/// A registry of available tools, keyed by name.
///
/// Registration validates each tool's declaration, so only well-formed,
/// declared tools can ever be dispatched.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting malformed declarations and duplicate names.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ToolError::InvalidRegistration(format!(
                "tool name '{name}' must be non-empty snake_case"
            )));
        }
        if tool.input_schema().get("type").and_then(Value::as_str) != Some("object") {
            return Err(ToolError::InvalidRegistration(format!(
                "tool '{name}' must declare an object input schema"
            )));
        }
        if self.tools.contains_key(&name) {
            return Err(ToolError::InvalidRegistration(format!(
                "tool '{name}' is registered twice"
            )));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Status label for a tool, or a generic one for unknown names.
    pub fn status_label(&self, name: &str) -> String {
        self.get(name)
            .map(|t| t.status_label())
            .unwrap_or(FALLBACK_STATUS_LABEL)
            .to_string()
    }

    /// Dispatch a call. Never fails and never panics past this point:
    /// unknown tools, handler errors and handler panics all come back as
    /// `ToolOutcome::Error`.
    pub async fn execute(&self, name: &str, input: Value, ctx: &TenantContext) -> ToolOutcome {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, tenant_id = %ctx.tenant_id, "Dispatch of unregistered tool refused");
            return ToolOutcome::error(format!("Unknown tool: {name}"));
        };

        debug!(tool = %name, tenant_id = %ctx.tenant_id, "Executing tool");
        match AssertUnwindSafe(tool.execute(input, ctx)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(tool = %name, tenant_id = %ctx.tenant_id, error = %e, "Tool execution failed");
                ToolOutcome::error(e.to_string())
            }
            Err(_) => {
                error!(tool = %name, tenant_id = %ctx.tenant_id, "Tool handler panicked");
                ToolOutcome::error(format!("Tool '{name}' failed unexpectedly"))
            }
        }
    }
}

/// What the agent loop needs from the tool side: a catalog, status labels,
/// and a dispatcher.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    fn status_label(&self, name: &str) -> String;

    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome;
}

/// A registry bound to one tenant for the length of one request.
#[derive(Clone)]
pub struct TenantToolbox {
    registry: Arc<ToolRegistry>,
    ctx: TenantContext,
}

impl TenantToolbox {
    pub fn new(registry: Arc<ToolRegistry>, ctx: TenantContext) -> Self {
        Self { registry, ctx }
    }

    pub fn context(&self) -> &TenantContext {
        &self.ctx
    }
}

#[async_trait]
impl ToolExecutor for TenantToolbox {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    fn status_label(&self, name: &str) -> String {
        self.registry.status_label(name)
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        self.registry
            .execute(&invocation.name, invocation.input.clone(), &self.ctx)
            .await
    }
}
