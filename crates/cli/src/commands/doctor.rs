//! `bizpilot doctor`: diagnose setup problems.

use std::path::Path;

use bizpilot_agent::KnowledgeCatalog;
use bizpilot_store::SqliteStore;

use super::load_config;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("BizPilot Doctor");
    println!("===============\n");

    let mut issues = 0;

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  ok    Config valid");
            config
        }
        Err(e) => {
            println!("  fail  Config invalid: {e}");
            println!("\n  1 issue found. Fix the config and run doctor again.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ok    API key configured");
    } else {
        println!("  warn  No API key: set BIZPILOT_API_KEY or ANTHROPIC_API_KEY");
        issues += 1;
    }

    match bizpilot_tools::default_registry() {
        Ok(registry) => println!("  ok    {} tools registered", registry.len()),
        Err(e) => {
            println!("  fail  Tool registry: {e}");
            issues += 1;
        }
    }

    match KnowledgeCatalog::from_config(&config.knowledge) {
        Ok(catalog) => println!(
            "  ok    Knowledge catalog {} ({} fragments)",
            catalog.version(),
            catalog.len()
        ),
        Err(e) => {
            println!("  fail  Knowledge catalog: {e}");
            issues += 1;
        }
    }

    match SqliteStore::connect(&config.database.url, config.database.max_connections).await {
        Ok(_) => println!("  ok    Database reachable"),
        Err(e) => {
            println!("  fail  Database: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
