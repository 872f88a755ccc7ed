//! Datastore trait: the tenant-scoped view of a business's records.
//!
//! Every method takes the tenant explicitly. Implementations must filter
//! every query by it; there is no other isolation between tenants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::tenant::TenantId;

/// Business-level details used in message templates and prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Unit price in cents
    pub price_cents: i64,
    pub stock: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Client {
    /// First word of the name, or the whole name.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Input for creating an event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub client_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub notes: Option<String>,
    pub created_by: String,
}

/// One row of the message/audit log written after an executed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub id: String,
    /// Tool that performed the action
    pub tool: String,
    /// Acting user id
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Message body or a human-readable description of the change
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl MessageLogEntry {
    pub fn new(tool: impl Into<String>, actor: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tool: tool.into(),
            actor: actor.into(),
            client_id: None,
            channel: None,
            body: body.into(),
            created_at: Utc::now(),
        }
    }

    pub fn for_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn via(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// Case-insensitive partial match used by every name lookup.
///
/// `query` is trimmed and matched literally; case folding is Unicode-aware.
pub fn matches_query(haystack: &str, query: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&query.trim().to_lowercase())
}

/// The datastore as seen by tool handlers.
///
/// Name lookups are case-insensitive partial matches and return every
/// candidate; choosing among them is the caller's job.
#[async_trait]
pub trait BusinessStore: Send + Sync {
    /// A human-readable name for this backend (e.g., "sqlite").
    fn name(&self) -> &str;

    async fn business_profile(&self, tenant: &TenantId)
    -> Result<Option<BusinessProfile>, StoreError>;

    /// Products whose name or SKU contains `query`.
    async fn find_products(&self, tenant: &TenantId, query: &str)
    -> Result<Vec<Product>, StoreError>;

    /// Products with stock at or below `threshold`, lowest first.
    async fn products_at_or_below(
        &self,
        tenant: &TenantId,
        threshold: i64,
    ) -> Result<Vec<Product>, StoreError>;

    async fn set_product_price(
        &self,
        tenant: &TenantId,
        product_id: &str,
        price_cents: i64,
    ) -> Result<(), StoreError>;

    async fn set_product_stock(
        &self,
        tenant: &TenantId,
        product_id: &str,
        stock: i64,
    ) -> Result<(), StoreError>;

    /// Clients whose name or email contains `query`.
    async fn find_clients(&self, tenant: &TenantId, query: &str)
    -> Result<Vec<Client>, StoreError>;

    /// All clients, or only those carrying `tag`.
    async fn list_clients(
        &self,
        tenant: &TenantId,
        tag: Option<&str>,
    ) -> Result<Vec<Client>, StoreError>;

    async fn delete_client(&self, tenant: &TenantId, client_id: &str) -> Result<(), StoreError>;

    async fn insert_event(&self, tenant: &TenantId, event: NewEvent) -> Result<Event, StoreError>;

    /// Events starting in `[from, to)`, earliest first.
    async fn events_between(
        &self,
        tenant: &TenantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError>;

    async fn append_message_log(
        &self,
        tenant: &TenantId,
        entry: MessageLogEntry,
    ) -> Result<(), StoreError>;
}
