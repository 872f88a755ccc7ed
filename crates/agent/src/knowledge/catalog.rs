//! The static knowledge catalog.
//!
//! A built-in catalog ships with the binary; `knowledge.catalog_path` can
//! point at a TOML file that replaces it:
//!
//! ```toml
//! version = "acme-3"
//! defaults = ["getting_started"]
//!
//! [[fragment]]
//! id = "getting_started"
//! label = "Getting started"
//! keywords = ["help", "how do i"]
//! data = "..."
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bizpilot_config::KnowledgeConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Version of the built-in catalog.
pub const CATALOG_VERSION: &str = "2025.06";

/// One keyword-tagged unit of domain knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeFragment {
    pub id: String,
    pub label: String,
    pub data: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Added to the score when at least one keyword matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to read knowledge catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse knowledge catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid knowledge catalog: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: String,
    defaults: Vec<String>,
    #[serde(rename = "fragment", default)]
    fragments: Vec<KnowledgeFragment>,
}

/// A validated, immutable list of fragments plus the default subset used
/// when nothing matches.
#[derive(Debug, Clone)]
pub struct KnowledgeCatalog {
    version: String,
    fragments: Vec<KnowledgeFragment>,
    defaults: Vec<usize>,
}

impl KnowledgeCatalog {
    /// Build and validate a catalog. Keywords are trimmed and lowercased.
    pub fn new(
        version: impl Into<String>,
        fragments: Vec<KnowledgeFragment>,
        default_ids: &[String],
    ) -> Result<Self, KnowledgeError> {
        if fragments.is_empty() {
            return Err(KnowledgeError::Invalid("catalog has no fragments".into()));
        }

        let mut seen = HashSet::new();
        let fragments: Vec<KnowledgeFragment> = fragments
            .into_iter()
            .map(|mut f| {
                f.keywords = f
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                f
            })
            .collect();
        for f in &fragments {
            if f.id.trim().is_empty() {
                return Err(KnowledgeError::Invalid("fragment with empty id".into()));
            }
            if !seen.insert(f.id.as_str()) {
                return Err(KnowledgeError::Invalid(format!(
                    "duplicate fragment id '{}'",
                    f.id
                )));
            }
        }

        if default_ids.is_empty() {
            return Err(KnowledgeError::Invalid(
                "the default fragment set must not be empty".into(),
            ));
        }
        let defaults = default_ids
            .iter()
            .map(|id| {
                fragments.iter().position(|f| &f.id == id).ok_or_else(|| {
                    KnowledgeError::Invalid(format!("default fragment '{id}' does not exist"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: version.into(),
            fragments,
            defaults,
        })
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> Self {
        let fragments: Vec<KnowledgeFragment> = BUILTIN
            .iter()
            .map(|b| KnowledgeFragment {
                id: b.id.into(),
                label: b.label.into(),
                data: b.data.into(),
                keywords: b.keywords.iter().map(|k| k.to_string()).collect(),
                priority: b.priority,
            })
            .collect();
        let defaults = BUILTIN_DEFAULTS
            .iter()
            .filter_map(|id| fragments.iter().position(|f| f.id == *id))
            .collect();
        Self {
            version: CATALOG_VERSION.into(),
            fragments,
            defaults,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, KnowledgeError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.version, file.fragments, &file.defaults)
    }

    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let content = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            version = %catalog.version,
            fragments = catalog.fragments.len(),
            "Loaded knowledge catalog"
        );
        Ok(catalog)
    }

    /// The configured catalog file, or the built-in one.
    pub fn from_config(config: &KnowledgeConfig) -> Result<Self, KnowledgeError> {
        match &config.catalog_path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fragments(&self) -> &[KnowledgeFragment] {
        &self.fragments
    }

    /// The fallback selection, in declared order.
    pub fn defaults(&self) -> Vec<&KnowledgeFragment> {
        self.defaults.iter().map(|&i| &self.fragments[i]).collect()
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeFragment> {
        self.fragments.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

struct BuiltinFragment {
    id: &'static str,
    label: &'static str,
    keywords: &'static [&'static str],
    priority: Option<i64>,
    data: &'static str,
}

const BUILTIN_DEFAULTS: &[&str] = &["getting_started", "assistant_capabilities"];

const BUILTIN: &[BuiltinFragment] = &[
    BuiltinFragment {
        id: "getting_started",
        label: "Getting started",
        keywords: &["help", "get started", "getting started", "how do i", "new here", "setup"],
        priority: None,
        data: "The dashboard has four main areas: Inventory (products, prices, stock), Clients (contact records and tags), Calendar (appointments and pickups) and Messages (SMS and email to clients). Most tasks can be done by asking the assistant directly.",
    },
    BuiltinFragment {
        id: "assistant_capabilities",
        label: "What the assistant can do",
        keywords: &["what can you do", "can you", "assistant", "abilities"],
        priority: None,
        data: "The assistant can check stock, list low-stock products, search clients, list upcoming events, change prices, adjust stock counts, create events, message one client or a tagged group, and delete client records. Changes to prices, messages and deletions are always previewed and need the user's explicit approval.",
    },
    BuiltinFragment {
        id: "inventory_basics",
        label: "Inventory",
        keywords: &["inventory", "stock", "in stock", "how many", "sku", "product", "restock"],
        priority: None,
        data: "Each product has a name, an optional SKU, a price and a stock count. Stock can be set to an exact number or adjusted by a delta after a sale or delivery. Stock never goes below zero.",
    },
    BuiltinFragment {
        id: "low_stock",
        label: "Low stock and reordering",
        keywords: &["low stock", "running low", "reorder", "sold out", "out of stock", "threshold"],
        priority: Some(1),
        data: "A product is low on stock at or below the threshold (5 units unless the user says otherwise). Products at zero are sold out and should be reordered or hidden from the storefront.",
    },
    BuiltinFragment {
        id: "pricing",
        label: "Pricing",
        keywords: &["price", "pricing", "discount", "markup", "cost", "how much", "$"],
        priority: Some(2),
        data: "Prices are stored in cents and shown with two decimals. A price change takes effect immediately on every channel once approved. Prices cannot be negative; a price of $0.00 is allowed for giveaways.",
    },
    BuiltinFragment {
        id: "client_records",
        label: "Client records",
        keywords: &["client", "customer", "contact", "email address", "phone number", "tag", "vip"],
        priority: None,
        data: "Clients have a name, optional email and phone, and free-form tags such as vip or wholesale. Tags are used to target bulk messages. Name searches are partial and case-insensitive, so several clients can match.",
    },
    BuiltinFragment {
        id: "client_privacy",
        label: "Privacy and deleting clients",
        keywords: &["delete", "remove", "privacy", "gdpr", "forget", "erase"],
        priority: Some(3),
        data: "Deleting a client removes their record permanently and cannot be undone. Past message log entries are kept for auditing. Only delete a client when the user clearly asks for it and has confirmed the preview.",
    },
    BuiltinFragment {
        id: "messaging",
        label: "Messaging clients",
        keywords: &["message", "text", "sms", "email", "send", "remind", "notify", "template"],
        priority: None,
        data: "Messages can go out by SMS (to the client's phone) or email. Templates may use {{client_name}}, {{first_name}}, {{business_name}} and {{business_phone}}. Unknown placeholders are sent as written, so check the preview. Every sent message is recorded in the message log.",
    },
    BuiltinFragment {
        id: "messaging_compliance",
        label: "Messaging etiquette and consent",
        keywords: &["bulk", "blast", "campaign", "everyone", "all clients", "marketing", "promotion", "unsubscribe"],
        priority: Some(3),
        data: "Bulk messages should only go to clients who agreed to hear from the business. Keep marketing texts short, identify the business by name and avoid sending outside 8am to 9pm local time. Preview the recipient count before approving.",
    },
    BuiltinFragment {
        id: "calendar",
        label: "Calendar and appointments",
        keywords: &["calendar", "appointment", "schedule", "booking", "event", "pickup", "fitting", "tomorrow", "next week"],
        priority: None,
        data: "Events have a title, a start time, a duration (60 minutes by default) and optionally a client. Upcoming events can be listed for the next 1 to 90 days. Times are stored in UTC and shown in the business's local time.",
    },
    BuiltinFragment {
        id: "reports",
        label: "Reports",
        keywords: &["report", "sales", "revenue", "best seller", "analytics", "dashboard"],
        priority: None,
        data: "Sales and revenue reports live on the Reports page of the dashboard. The assistant cannot generate reports itself but can point the user to the right page and answer stock and client questions directly.",
    },
    BuiltinFragment {
        id: "billing",
        label: "Plans and billing",
        keywords: &["billing", "invoice", "subscription", "plan", "upgrade", "payment", "cancel"],
        priority: None,
        data: "Subscription plans and invoices are managed under Settings, Billing. The assistant cannot change plans or payment details; direct the user to that page or to support.",
    },
];
