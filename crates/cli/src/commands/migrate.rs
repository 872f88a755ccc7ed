//! `bizpilot migrate`: create the schema and optionally seed a demo tenant.

use std::path::Path;

use bizpilot_core::tenant::TenantId;
use bizpilot_store::SqliteStore;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    seed_tenant: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    println!("Migrating {}", config.database.url);
    let store = SqliteStore::connect(&config.database.url, config.database.max_connections).await?;
    println!("   Schema up to date");

    if let Some(tenant) = seed_tenant.map(str::trim).filter(|t| !t.is_empty()) {
        store.seed_demo(&TenantId::new(tenant)).await?;
        println!("   Demo data loaded for tenant '{tenant}'");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrates_and_seeds_a_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("bizpilot.db");
        let config_file = dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            format!(
                "[database]\nurl = \"sqlite://{}?mode=rwc\"\nmax_connections = 2\n",
                db.display()
            ),
        )
        .unwrap();

        run(Some(&config_file), Some("demo")).await.unwrap();
        // rerunning is harmless
        run(Some(&config_file), None).await.unwrap();
        assert!(db.exists());
    }
}
