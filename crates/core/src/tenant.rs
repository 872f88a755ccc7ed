//! Tenant identity and the per-request tool execution context.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::AuditQueue;
use crate::outbound::Messenger;
use crate::store::BusinessStore;

/// Identifier of one tenant (one business account).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a tool handler may touch while serving one request.
///
/// Built by the request handler after tenant resolution. Handlers pass
/// `tenant_id` to every store call; the store has no other notion of tenancy.
#[derive(Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub acting_user_id: String,
    pub store: Arc<dyn BusinessStore>,
    pub messenger: Arc<dyn Messenger>,
    pub audit: AuditQueue,
}

impl TenantContext {
    pub fn new(
        tenant_id: TenantId,
        acting_user_id: impl Into<String>,
        store: Arc<dyn BusinessStore>,
        messenger: Arc<dyn Messenger>,
        audit: AuditQueue,
    ) -> Self {
        Self {
            tenant_id,
            acting_user_id: acting_user_id.into(),
            store,
            messenger,
            audit,
        }
    }
}

impl std::fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantContext")
            .field("tenant_id", &self.tenant_id)
            .field("acting_user_id", &self.acting_user_id)
            .field("store", &self.store.name())
            .field("messenger", &self.messenger.name())
            .finish()
    }
}
