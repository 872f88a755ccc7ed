//! SQLite datastore.
//!
//! One database holds every tenant's rows; each table carries a `tenant_id`
//! column and every statement filters on it.

use async_trait::async_trait;
use bizpilot_core::error::StoreError;
use bizpilot_core::store::{
    BusinessProfile, BusinessStore, Client, Event, MessageLogEntry, NewEvent, Product,
    matches_query,
};
use bizpilot_core::tenant::TenantId;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::demo;

/// A SQLite-backed business store.
pub struct SqliteStore {
    pool: SqlitePool,
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("bad timestamp '{s}': {e}")))
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and run migrations.
    ///
    /// Pass `sqlite::memory:` for an ephemeral database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connection(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // Each connection to :memory: is its own database
        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create tables and indexes.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements: [(&str, &str); 9] = [
            (
                "businesses table",
                r#"
                CREATE TABLE IF NOT EXISTS businesses (
                    tenant_id   TEXT PRIMARY KEY,
                    name        TEXT NOT NULL,
                    phone       TEXT
                )
                "#,
            ),
            (
                "products table",
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    id           TEXT PRIMARY KEY,
                    tenant_id    TEXT NOT NULL,
                    name         TEXT NOT NULL,
                    sku          TEXT,
                    price_cents  INTEGER NOT NULL CHECK (price_cents >= 0),
                    stock        INTEGER NOT NULL CHECK (stock >= 0)
                )
                "#,
            ),
            (
                "clients table",
                r#"
                CREATE TABLE IF NOT EXISTS clients (
                    id          TEXT PRIMARY KEY,
                    tenant_id   TEXT NOT NULL,
                    name        TEXT NOT NULL,
                    email       TEXT,
                    phone       TEXT,
                    tags        TEXT NOT NULL DEFAULT '[]'
                )
                "#,
            ),
            (
                "events table",
                r#"
                CREATE TABLE IF NOT EXISTS events (
                    id                TEXT PRIMARY KEY,
                    tenant_id         TEXT NOT NULL,
                    title             TEXT NOT NULL,
                    client_id         TEXT,
                    starts_at         TEXT NOT NULL,
                    duration_minutes  INTEGER NOT NULL,
                    notes             TEXT,
                    created_by        TEXT NOT NULL,
                    created_at        TEXT NOT NULL
                )
                "#,
            ),
            (
                "message_log table",
                r#"
                CREATE TABLE IF NOT EXISTS message_log (
                    id          TEXT PRIMARY KEY,
                    tenant_id   TEXT NOT NULL,
                    tool        TEXT NOT NULL,
                    actor       TEXT NOT NULL,
                    client_id   TEXT,
                    channel     TEXT,
                    body        TEXT NOT NULL,
                    created_at  TEXT NOT NULL
                )
                "#,
            ),
            (
                "products index",
                "CREATE INDEX IF NOT EXISTS idx_products_tenant ON products(tenant_id, name)",
            ),
            (
                "clients index",
                "CREATE INDEX IF NOT EXISTS idx_clients_tenant ON clients(tenant_id, name)",
            ),
            (
                "events index",
                "CREATE INDEX IF NOT EXISTS idx_events_tenant ON events(tenant_id, starts_at)",
            ),
            (
                "message_log index",
                "CREATE INDEX IF NOT EXISTS idx_message_log_tenant ON message_log(tenant_id, created_at)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Migration(format!("{what}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Insert the demo dataset for `tenant`, replacing any previous demo rows.
    pub async fn seed_demo(&self, tenant: &TenantId) -> Result<(), StoreError> {
        let t = tenant.as_str();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        for table in ["products", "clients", "events", "businesses"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE tenant_id = ?1"))
                .bind(t)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Query(format!("clear {table}: {e}")))?;
        }

        let profile = demo::profile();
        sqlx::query("INSERT INTO businesses (tenant_id, name, phone) VALUES (?1, ?2, ?3)")
            .bind(t)
            .bind(&profile.name)
            .bind(&profile.phone)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Query(format!("seed business: {e}")))?;

        for p in demo::products(tenant) {
            sqlx::query(
                "INSERT INTO products (id, tenant_id, name, sku, price_cents, stock) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&p.id)
            .bind(t)
            .bind(&p.name)
            .bind(&p.sku)
            .bind(p.price_cents)
            .bind(p.stock)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Query(format!("seed product: {e}")))?;
        }

        for c in demo::clients(tenant) {
            let tags = serde_json::to_string(&c.tags)
                .map_err(|e| StoreError::Query(format!("tags serialization: {e}")))?;
            sqlx::query(
                "INSERT INTO clients (id, tenant_id, name, email, phone, tags) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&c.id)
            .bind(t)
            .bind(&c.name)
            .bind(&c.email)
            .bind(&c.phone)
            .bind(&tags)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Query(format!("seed client: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Query(format!("seed commit: {e}")))?;
        info!(tenant_id = %tenant, "Seeded demo data");
        Ok(())
    }

    fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, StoreError> {
        let get = |col: &str| StoreError::Query(format!("products.{col} column"));
        Ok(Product {
            id: row.try_get("id").map_err(|_| get("id"))?,
            name: row.try_get("name").map_err(|_| get("name"))?,
            sku: row.try_get("sku").map_err(|_| get("sku"))?,
            price_cents: row.try_get("price_cents").map_err(|_| get("price_cents"))?,
            stock: row.try_get("stock").map_err(|_| get("stock"))?,
        })
    }

    fn row_to_client(row: &sqlx::sqlite::SqliteRow) -> Result<Client, StoreError> {
        let get = |col: &str| StoreError::Query(format!("clients.{col} column"));
        let tags_json: String = row.try_get("tags").map_err(|_| get("tags"))?;
        Ok(Client {
            id: row.try_get("id").map_err(|_| get("id"))?,
            name: row.try_get("name").map_err(|_| get("name"))?,
            email: row.try_get("email").map_err(|_| get("email"))?,
            phone: row.try_get("phone").map_err(|_| get("phone"))?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        })
    }

    fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<Event, StoreError> {
        let get = |col: &str| StoreError::Query(format!("events.{col} column"));
        let starts_at: String = row.try_get("starts_at").map_err(|_| get("starts_at"))?;
        Ok(Event {
            id: row.try_get("id").map_err(|_| get("id"))?,
            title: row.try_get("title").map_err(|_| get("title"))?,
            client_id: row.try_get("client_id").map_err(|_| get("client_id"))?,
            starts_at: parse_timestamp(&starts_at)?,
            duration_minutes: row
                .try_get("duration_minutes")
                .map_err(|_| get("duration_minutes"))?,
            notes: row.try_get("notes").map_err(|_| get("notes"))?,
        })
    }

    /// All message log rows for a tenant, oldest first.
    pub async fn message_log(&self, tenant: &TenantId) -> Result<Vec<MessageLogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM message_log WHERE tenant_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("message_log: {e}")))?;

        rows.iter()
            .map(|row| {
                let get = |col: &str| StoreError::Query(format!("message_log.{col} column"));
                let created_at: String = row.try_get("created_at").map_err(|_| get("created_at"))?;
                Ok(MessageLogEntry {
                    id: row.try_get("id").map_err(|_| get("id"))?,
                    tool: row.try_get("tool").map_err(|_| get("tool"))?,
                    actor: row.try_get("actor").map_err(|_| get("actor"))?,
                    client_id: row.try_get("client_id").map_err(|_| get("client_id"))?,
                    channel: row.try_get("channel").map_err(|_| get("channel"))?,
                    body: row.try_get("body").map_err(|_| get("body"))?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl BusinessStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn business_profile(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<BusinessProfile>, StoreError> {
        let row = sqlx::query("SELECT name, phone FROM businesses WHERE tenant_id = ?1")
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("business profile: {e}")))?;

        row.map(|row| {
            Ok(BusinessProfile {
                name: row
                    .try_get("name")
                    .map_err(|e| StoreError::Query(format!("businesses.name column: {e}")))?,
                phone: row
                    .try_get("phone")
                    .map_err(|e| StoreError::Query(format!("businesses.phone column: {e}")))?,
            })
        })
        .transpose()
    }

    async fn find_products(
        &self,
        tenant: &TenantId,
        query: &str,
    ) -> Result<Vec<Product>, StoreError> {
        // SQLite's LIKE treats `%`/`_` as wildcards and folds ASCII only, so
        // matching happens here over the tenant's rows.
        let rows = sqlx::query("SELECT * FROM products WHERE tenant_id = ?1 ORDER BY name")
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("find products: {e}")))?;

        let mut found = Vec::new();
        for row in &rows {
            let product = Self::row_to_product(row)?;
            if matches_query(&product.name, query)
                || product.sku.as_deref().is_some_and(|s| matches_query(s, query))
            {
                found.push(product);
            }
        }
        Ok(found)
    }

    async fn products_at_or_below(
        &self,
        tenant: &TenantId,
        threshold: i64,
    ) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM products WHERE tenant_id = ?1 AND stock <= ?2 ORDER BY stock, name",
        )
        .bind(tenant.as_str())
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("low stock: {e}")))?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn set_product_price(
        &self,
        tenant: &TenantId,
        product_id: &str,
        price_cents: i64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET price_cents = ?1 WHERE tenant_id = ?2 AND id = ?3")
            .bind(price_cents)
            .bind(tenant.as_str())
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("update price: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {product_id}")));
        }
        Ok(())
    }

    async fn set_product_stock(
        &self,
        tenant: &TenantId,
        product_id: &str,
        stock: i64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET stock = ?1 WHERE tenant_id = ?2 AND id = ?3")
            .bind(stock)
            .bind(tenant.as_str())
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("update stock: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {product_id}")));
        }
        Ok(())
    }

    async fn find_clients(&self, tenant: &TenantId, query: &str) -> Result<Vec<Client>, StoreError> {
        let rows = sqlx::query("SELECT * FROM clients WHERE tenant_id = ?1 ORDER BY name")
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("find clients: {e}")))?;

        let mut found = Vec::new();
        for row in &rows {
            let client = Self::row_to_client(row)?;
            if matches_query(&client.name, query)
                || client.email.as_deref().is_some_and(|e| matches_query(e, query))
            {
                found.push(client);
            }
        }
        Ok(found)
    }

    async fn list_clients(
        &self,
        tenant: &TenantId,
        tag: Option<&str>,
    ) -> Result<Vec<Client>, StoreError> {
        let rows = match tag {
            Some(tag) => {
                sqlx::query(
                    r#"
                    SELECT * FROM clients
                    WHERE tenant_id = ?1
                      AND EXISTS (SELECT 1 FROM json_each(clients.tags)
                                  WHERE LOWER(json_each.value) = LOWER(?2))
                    ORDER BY name
                    "#,
                )
                .bind(tenant.as_str())
                .bind(tag)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM clients WHERE tenant_id = ?1 ORDER BY name")
                    .bind(tenant.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| StoreError::Query(format!("list clients: {e}")))?;

        rows.iter().map(Self::row_to_client).collect()
    }

    async fn delete_client(&self, tenant: &TenantId, client_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM clients WHERE tenant_id = ?1 AND id = ?2")
            .bind(tenant.as_str())
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("delete client: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("client {client_id}")));
        }
        Ok(())
    }

    async fn insert_event(&self, tenant: &TenantId, event: NewEvent) -> Result<Event, StoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO events (id, tenant_id, title, client_id, starts_at, duration_minutes, notes, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&id)
        .bind(tenant.as_str())
        .bind(&event.title)
        .bind(&event.client_id)
        .bind(timestamp(&event.starts_at))
        .bind(event.duration_minutes)
        .bind(&event.notes)
        .bind(&event.created_by)
        .bind(timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("insert event: {e}")))?;

        debug!(tenant_id = %tenant, event_id = %id, "Inserted event");
        Ok(Event {
            id,
            title: event.title,
            client_id: event.client_id,
            starts_at: event.starts_at,
            duration_minutes: event.duration_minutes,
            notes: event.notes,
        })
    }

    async fn events_between(
        &self,
        tenant: &TenantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM events
            WHERE tenant_id = ?1 AND starts_at >= ?2 AND starts_at < ?3
            ORDER BY starts_at
            "#,
        )
        .bind(tenant.as_str())
        .bind(timestamp(&from))
        .bind(timestamp(&to))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("events between: {e}")))?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn append_message_log(
        &self,
        tenant: &TenantId,
        entry: MessageLogEntry,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO message_log (id, tenant_id, tool, actor, client_id, channel, body, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(tenant.as_str())
        .bind(&entry.tool)
        .bind(&entry.actor)
        .bind(&entry.client_id)
        .bind(&entry.channel)
        .bind(&entry.body)
        .bind(timestamp(&entry.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(format!("append message log: {e}")))?;
        Ok(())
    }
}
