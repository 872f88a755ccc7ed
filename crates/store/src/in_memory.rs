//! In-memory store, useful for testing and ephemeral demos.
//!
//! Counts every successful mutation so tests can assert that a preview or
//! a clarification request changed nothing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bizpilot_core::error::StoreError;
use bizpilot_core::store::{
    BusinessProfile, BusinessStore, Client, Event, MessageLogEntry, NewEvent, Product,
    matches_query,
};
use bizpilot_core::tenant::TenantId;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::demo;

#[derive(Debug, Default, Clone)]
struct TenantData {
    profile: Option<BusinessProfile>,
    products: Vec<Product>,
    clients: Vec<Client>,
    events: Vec<Event>,
    log: Vec<MessageLogEntry>,
}

/// A store that keeps every tenant's records in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    tenants: Arc<RwLock<HashMap<TenantId, TenantData>>>,
    mutations: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the demo dataset for `tenant`.
    pub async fn with_demo(tenant: &TenantId) -> Self {
        let store = Self::new();
        store.seed_demo(tenant).await;
        store
    }

    pub async fn seed_demo(&self, tenant: &TenantId) {
        let mut tenants = self.tenants.write().await;
        tenants.insert(
            tenant.clone(),
            TenantData {
                profile: Some(demo::profile()),
                products: demo::products(tenant),
                clients: demo::clients(tenant),
                ..TenantData::default()
            },
        );
    }

    pub async fn insert_product(&self, tenant: &TenantId, product: Product) {
        self.tenants
            .write()
            .await
            .entry(tenant.clone())
            .or_default()
            .products
            .push(product);
    }

    pub async fn insert_client(&self, tenant: &TenantId, client: Client) {
        self.tenants
            .write()
            .await
            .entry(tenant.clone())
            .or_default()
            .clients
            .push(client);
    }

    /// Number of successful writes to business records (log appends excluded).
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub async fn message_log(&self, tenant: &TenantId) -> Vec<MessageLogEntry> {
        self.tenants
            .read()
            .await
            .get(tenant)
            .map(|d| d.log.clone())
            .unwrap_or_default()
    }

    pub async fn product(&self, tenant: &TenantId, product_id: &str) -> Option<Product> {
        self.tenants
            .read()
            .await
            .get(tenant)
            .and_then(|d| d.products.iter().find(|p| p.id == product_id).cloned())
    }

    pub async fn events(&self, tenant: &TenantId) -> Vec<Event> {
        self.tenants
            .read()
            .await
            .get(tenant)
            .map(|d| d.events.clone())
            .unwrap_or_default()
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BusinessStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn business_profile(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<BusinessProfile>, StoreError> {
        Ok(self
            .tenants
            .read()
            .await
            .get(tenant)
            .and_then(|d| d.profile.clone()))
    }

    async fn find_products(
        &self,
        tenant: &TenantId,
        query: &str,
    ) -> Result<Vec<Product>, StoreError> {
        let tenants = self.tenants.read().await;
        let mut found: Vec<Product> = tenants
            .get(tenant)
            .map(|d| {
                d.products
                    .iter()
                    .filter(|p| {
                        matches_query(&p.name, query)
                            || p.sku.as_deref().is_some_and(|s| matches_query(s, query))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn products_at_or_below(
        &self,
        tenant: &TenantId,
        threshold: i64,
    ) -> Result<Vec<Product>, StoreError> {
        let tenants = self.tenants.read().await;
        let mut found: Vec<Product> = tenants
            .get(tenant)
            .map(|d| {
                d.products
                    .iter()
                    .filter(|p| p.stock <= threshold)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
        Ok(found)
    }

    async fn set_product_price(
        &self,
        tenant: &TenantId,
        product_id: &str,
        price_cents: i64,
    ) -> Result<(), StoreError> {
        let mut tenants = self.tenants.write().await;
        let product = tenants
            .get_mut(tenant)
            .and_then(|d| d.products.iter_mut().find(|p| p.id == product_id))
            .ok_or_else(|| StoreError::NotFound(format!("product {product_id}")))?;
        product.price_cents = price_cents;
        self.mutated();
        Ok(())
    }

    async fn set_product_stock(
        &self,
        tenant: &TenantId,
        product_id: &str,
        stock: i64,
    ) -> Result<(), StoreError> {
        let mut tenants = self.tenants.write().await;
        let product = tenants
            .get_mut(tenant)
            .and_then(|d| d.products.iter_mut().find(|p| p.id == product_id))
            .ok_or_else(|| StoreError::NotFound(format!("product {product_id}")))?;
        product.stock = stock;
        self.mutated();
        Ok(())
    }

    async fn find_clients(&self, tenant: &TenantId, query: &str) -> Result<Vec<Client>, StoreError> {
        let tenants = self.tenants.read().await;
        let mut found: Vec<Client> = tenants
            .get(tenant)
            .map(|d| {
                d.clients
                    .iter()
                    .filter(|c| {
                        matches_query(&c.name, query)
                            || c.email.as_deref().is_some_and(|e| matches_query(e, query))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn list_clients(
        &self,
        tenant: &TenantId,
        tag: Option<&str>,
    ) -> Result<Vec<Client>, StoreError> {
        let tenants = self.tenants.read().await;
        let mut found: Vec<Client> = tenants
            .get(tenant)
            .map(|d| {
                d.clients
                    .iter()
                    .filter(|c| match tag {
                        Some(tag) => c.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
                        None => true,
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn delete_client(&self, tenant: &TenantId, client_id: &str) -> Result<(), StoreError> {
        let mut tenants = self.tenants.write().await;
        let data = tenants
            .get_mut(tenant)
            .ok_or_else(|| StoreError::NotFound(format!("client {client_id}")))?;
        let before = data.clients.len();
        data.clients.retain(|c| c.id != client_id);
        if data.clients.len() == before {
            return Err(StoreError::NotFound(format!("client {client_id}")));
        }
        self.mutated();
        Ok(())
    }

    async fn insert_event(&self, tenant: &TenantId, event: NewEvent) -> Result<Event, StoreError> {
        let created = Event {
            id: Uuid::new_v4().to_string(),
            title: event.title,
            client_id: event.client_id,
            starts_at: event.starts_at,
            duration_minutes: event.duration_minutes,
            notes: event.notes,
        };
        self.tenants
            .write()
            .await
            .entry(tenant.clone())
            .or_default()
            .events
            .push(created.clone());
        self.mutated();
        Ok(created)
    }

    async fn events_between(
        &self,
        tenant: &TenantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let tenants = self.tenants.read().await;
        let mut found: Vec<Event> = tenants
            .get(tenant)
            .map(|d| {
                d.events
                    .iter()
                    .filter(|e| e.starts_at >= from && e.starts_at < to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by_key(|e| e.starts_at);
        Ok(found)
    }

    async fn append_message_log(
        &self,
        tenant: &TenantId,
        entry: MessageLogEntry,
    ) -> Result<(), StoreError> {
        self.tenants
            .write()
            .await
            .entry(tenant.clone())
            .or_default()
            .log
            .push(entry);
        Ok(())
    }
}
