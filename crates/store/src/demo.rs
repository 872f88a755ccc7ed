//! Demo dataset for `bizpilot migrate --seed-demo` and tests.
//!
//! Two "Aspen" products and two clients named Maria make the ambiguous
//! lookups easy to reproduce.

use bizpilot_core::store::{BusinessProfile, Client, Product};
use bizpilot_core::tenant::TenantId;

pub fn profile() -> BusinessProfile {
    BusinessProfile {
        name: "Harbor & Pine Jewelry".into(),
        phone: Some("(555) 014-2290".into()),
    }
}

pub fn products(tenant: &TenantId) -> Vec<Product> {
    let rows: [(&str, &str, &str, i64, i64); 5] = [
        ("aspen-necklace", "Aspen Chain Necklace", "ASP-NK-18", 8_900, 4),
        ("aspen-bracelet", "Aspen Chain Bracelet", "ASP-BR-07", 5_400, 12),
        ("juniper-hoops", "Juniper Hoop Earrings", "JUN-HP-01", 3_800, 2),
        ("cedar-signet", "Cedar Signet Ring", "CED-SG-02", 12_500, 7),
        ("willow-pendant", "Willow Pendant", "WIL-PD-03", 6_200, 0),
    ];
    rows.into_iter()
        .map(|(id, name, sku, price_cents, stock)| Product {
            id: format!("{tenant}-{id}"),
            name: name.into(),
            sku: Some(sku.into()),
            price_cents,
            stock,
        })
        .collect()
}

pub fn clients(tenant: &TenantId) -> Vec<Client> {
    let rows: [(&str, &str, Option<&str>, Option<&str>, &[&str]); 4] = [
        (
            "maria-lopez",
            "Maria Lopez",
            Some("maria.lopez@example.com"),
            Some("+15550100001"),
            &["vip"],
        ),
        (
            "maria-chen",
            "Maria Chen",
            Some("maria.chen@example.com"),
            Some("+15550100002"),
            &["wholesale"],
        ),
        (
            "daniel-okafor",
            "Daniel Okafor",
            Some("daniel.okafor@example.com"),
            None,
            &["vip"],
        ),
        (
            "priya-raman",
            "Priya Raman",
            None,
            Some("+15550100004"),
            &[],
        ),
    ];
    rows.into_iter()
        .map(|(id, name, email, phone, tags)| Client {
            id: format!("{tenant}-{id}"),
            name: name.into(),
            email: email.map(Into::into),
            phone: phone.map(Into::into),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        })
        .collect()
}
