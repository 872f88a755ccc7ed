//! Name resolution for tools that take a free-text name instead of an id.
//!
//! A lookup is a case-insensitive partial match. Two or more candidates is
//! never narrowed down here; the user has to pick.

use bizpilot_core::error::ToolError;
use bizpilot_core::store::{Client, Product};
use bizpilot_core::tenant::TenantContext;
use bizpilot_core::tool::ToolOutcome;
use serde_json::{Value, json};

use crate::args::format_cents;

/// Result of resolving a name against a tenant's records.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    NotFound,
    Unique(T),
    Ambiguous(Vec<T>),
}

impl<T> From<Vec<T>> for Resolution<T> {
    fn from(mut matches: Vec<T>) -> Self {
        match matches.len() {
            0 => Self::NotFound,
            1 => Self::Unique(matches.remove(0)),
            _ => Self::Ambiguous(matches),
        }
    }
}

/// Something that can be shown to the user as a candidate match.
pub trait Candidate {
    const ENTITY: &'static str;

    fn summary(&self) -> Value;
}

impl Candidate for Product {
    const ENTITY: &'static str = "product";

    fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "sku": self.sku,
            "price": format_cents(self.price_cents),
            "stock": self.stock,
        })
    }
}

impl Candidate for Client {
    const ENTITY: &'static str = "client";

    fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
        })
    }
}

impl<T: Candidate> Resolution<T> {
    /// The single match, or the outcome to return instead of acting.
    pub fn into_unique(self, query: &str) -> Result<T, ToolOutcome> {
        match self {
            Self::Unique(item) => Ok(item),
            Self::NotFound => Err(ToolOutcome::error(format!(
                "{} not found: '{query}'",
                T::ENTITY
            ))),
            Self::Ambiguous(items) => Err(ToolOutcome::NeedsClarification {
                entity: T::ENTITY.to_string(),
                matches: items.iter().map(Candidate::summary).collect(),
            }),
        }
    }
}

pub async fn resolve_product(
    ctx: &TenantContext,
    name: &str,
) -> Result<Resolution<Product>, ToolError> {
    Ok(ctx.store.find_products(&ctx.tenant_id, name).await?.into())
}

pub async fn resolve_client(
    ctx: &TenantContext,
    name: &str,
) -> Result<Resolution<Client>, ToolError> {
    Ok(ctx.store.find_clients(&ctx.tenant_id, name).await?.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str) -> Product {
        Product {
            id: name.to_lowercase(),
            name: name.into(),
            sku: None,
            price_cents: 100,
            stock: 1,
        }
    }

    #[test]
    fn match_count_decides_resolution() {
        assert_eq!(Resolution::<Product>::from(vec![]), Resolution::NotFound);
        assert!(matches!(
            Resolution::from(vec![product("A")]),
            Resolution::Unique(_)
        ));
        assert!(matches!(
            Resolution::from(vec![product("A"), product("B")]),
            Resolution::Ambiguous(ref v) if v.len() == 2
        ));
    }

    #[test]
    fn not_found_is_an_error_outcome() {
        let outcome = Resolution::<Product>::NotFound
            .into_unique("aspen")
            .unwrap_err();
        assert_eq!(outcome, ToolOutcome::error("product not found: 'aspen'"));
    }

    #[test]
    fn ambiguity_lists_every_candidate() {
        let outcome = Resolution::Ambiguous(vec![product("Aspen Necklace"), product("Aspen Bracelet")])
            .into_unique("aspen")
            .unwrap_err();
        match outcome {
            ToolOutcome::NeedsClarification { entity, matches } => {
                assert_eq!(entity, "product");
                assert_eq!(matches.len(), 2);
                assert_eq!(matches[1]["name"], "Aspen Bracelet");
            }
            other => panic!("expected clarification, got {other:?}"),
        }
    }
}
