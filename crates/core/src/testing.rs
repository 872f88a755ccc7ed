//! Stand-ins for unit tests in this crate.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::audit::AuditQueue;
use crate::error::{StoreError, ToolError};
use crate::outbound::{Messenger, OutboundMessage};
use crate::store::{BusinessProfile, BusinessStore, Client, Event, MessageLogEntry, NewEvent, Product};
use crate::tenant::{TenantContext, TenantId};

/// A store with no records. Writes succeed unless built with `failing()`.
#[derive(Default)]
pub struct NullStore {
    fail_writes: bool,
}

impl NullStore {
    pub fn failing() -> Self {
        Self { fail_writes: true }
    }

    fn write(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            Err(StoreError::Query("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BusinessStore for NullStore {
    fn name(&self) -> &str {
        "null"
    }

    async fn business_profile(&self, _: &TenantId) -> Result<Option<BusinessProfile>, StoreError> {
        Ok(None)
    }

    async fn find_products(&self, _: &TenantId, _: &str) -> Result<Vec<Product>, StoreError> {
        Ok(vec![])
    }

    async fn products_at_or_below(&self, _: &TenantId, _: i64) -> Result<Vec<Product>, StoreError> {
        Ok(vec![])
    }

    async fn set_product_price(&self, _: &TenantId, id: &str, _: i64) -> Result<(), StoreError> {
        Err(StoreError::NotFound(id.to_string()))
    }

    async fn set_product_stock(&self, _: &TenantId, id: &str, _: i64) -> Result<(), StoreError> {
        Err(StoreError::NotFound(id.to_string()))
    }

    async fn find_clients(&self, _: &TenantId, _: &str) -> Result<Vec<Client>, StoreError> {
        Ok(vec![])
    }

    async fn list_clients(&self, _: &TenantId, _: Option<&str>) -> Result<Vec<Client>, StoreError> {
        Ok(vec![])
    }

    async fn delete_client(&self, _: &TenantId, id: &str) -> Result<(), StoreError> {
        Err(StoreError::NotFound(id.to_string()))
    }

    async fn insert_event(&self, _: &TenantId, event: NewEvent) -> Result<Event, StoreError> {
        self.write()?;
        Ok(Event {
            id: "evt-null".into(),
            title: event.title,
            client_id: event.client_id,
            starts_at: event.starts_at,
            duration_minutes: event.duration_minutes,
            notes: event.notes,
        })
    }

    async fn events_between(
        &self,
        _: &TenantId,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        Ok(vec![])
    }

    async fn append_message_log(&self, _: &TenantId, _: MessageLogEntry) -> Result<(), StoreError> {
        self.write()
    }
}

pub struct NullMessenger;

#[async_trait]
impl Messenger for NullMessenger {
    fn name(&self) -> &str {
        "null"
    }

    async fn send(&self, _message: &OutboundMessage) -> Result<(), ToolError> {
        Ok(())
    }
}

/// A context backed by nothing, with auditing disabled.
pub fn detached_context(tenant: &str) -> TenantContext {
    TenantContext::new(
        TenantId::new(tenant),
        "test-user",
        Arc::new(NullStore::default()),
        Arc::new(NullMessenger),
        AuditQueue::disabled(),
    )
}
