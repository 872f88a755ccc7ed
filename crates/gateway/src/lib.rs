//! HTTP gateway for BizPilot.
//!
//! Exposes the health check and the assistant chat endpoint, which answers
//! with a `text/event-stream` of tool statuses and text chunks.
//!
//! Built on Axum. Tenant and user come from headers set by the auth layer in
//! front of this service.

pub mod chat;

pub use chat::answer;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, warn};

use bizpilot_agent::{AgentLoop, KnowledgeCatalog, KnowledgeSelector};
use bizpilot_config::{AppConfig, StreamConfig};
use bizpilot_core::audit::AuditQueue;
use bizpilot_core::outbound::Messenger;
use bizpilot_core::provider::Provider;
use bizpilot_core::store::BusinessStore;
use bizpilot_core::tool::ToolRegistry;

/// Request body limit.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
///
/// Everything here is built once at startup and shared read-only between
/// requests; per-request state lives in the handler.
pub struct GatewayState {
    pub agent: AgentLoop,
    pub registry: Arc<ToolRegistry>,
    pub selector: KnowledgeSelector,
    pub store: Arc<dyn BusinessStore>,
    pub messenger: Arc<dyn Messenger>,
    pub audit: AuditQueue,
    pub stream: StreamConfig,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Wire the request pipeline from config and already-built backends.
    pub fn from_parts(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        catalog: Arc<KnowledgeCatalog>,
        store: Arc<dyn BusinessStore>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            agent: AgentLoop::from_config(provider, config),
            registry,
            selector: KnowledgeSelector::from_config(catalog, &config.knowledge),
            audit: AuditQueue::spawn(store.clone()),
            store,
            messenger,
            stream: config.stream.clone(),
        }
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/assistant/chat", post(chat::chat_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

impl GatewayState {
    /// Build the production backends from config: the Anthropic provider, the
    /// SQLite store (migrated), the log messenger and the default tools.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let provider: Arc<dyn Provider> =
            Arc::new(bizpilot_providers::AnthropicProvider::from_config(config)?);
        let store = bizpilot_store::SqliteStore::connect(
            &config.database.url,
            config.database.max_connections,
        )
        .await?;
        let registry = Arc::new(bizpilot_tools::default_registry()?);
        let catalog = Arc::new(KnowledgeCatalog::from_config(&config.knowledge)?);

        info!(
            tools = registry.len(),
            knowledge_version = catalog.version(),
            model = %config.provider.model,
            "Assistant components ready"
        );

        Ok(Self::from_parts(
            config,
            provider,
            registry,
            catalog,
            Arc::new(store),
            Arc::new(bizpilot_store::LogMessenger),
        ))
    }
}

/// Start the gateway HTTP server.
///
/// Serves until Ctrl-C. Pending audit writes are flushed on shutdown.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(&config).await?);
    let app = build_router(state.clone());

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.audit.flush().await;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
