//! # BizPilot Core
//!
//! Domain types, traits, and error definitions for the BizPilot assistant.
//! This crate has no framework dependencies. It defines the domain model
//! the other crates implement against: providers, tools, the tenant-scoped
//! datastore, outbound messaging, and the audit queue.
//!
//! All crates depend inward on core.

pub mod audit;
pub mod error;
pub mod message;
pub mod outbound;
pub mod provider;
pub mod store;
pub mod tenant;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for ergonomics
pub use audit::AuditQueue;
pub use error::{Error, ProviderError, Result, StoreError, ToolError};
pub use message::{ContentBlock, Message, MessageContent, Role, Transcript};
pub use outbound::{DeliveryChannel, Messenger, OutboundMessage};
pub use provider::{CompletionRequest, CompletionResponse, Provider, StopReason, Usage};
pub use store::{
    BusinessProfile, BusinessStore, Client, Event, MessageLogEntry, NewEvent, Product, matches_query,
};
pub use tenant::{TenantContext, TenantId};
pub use tool::{
    FALLBACK_STATUS_LABEL, TenantToolbox, Tool, ToolDefinition, ToolExecutor, ToolInvocation,
    ToolOutcome, ToolRegistry, ToolResultEnvelope,
};
