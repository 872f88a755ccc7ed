//! `bizpilot knowledge`: preview knowledge selection for a message.

use std::path::Path;
use std::sync::Arc;

use bizpilot_agent::{KnowledgeCatalog, KnowledgeSelector, Selection};

use super::load_config;

pub fn run(
    config_path: Option<&Path>,
    text: &str,
    as_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let catalog = Arc::new(KnowledgeCatalog::from_config(&config.knowledge)?);
    let selector = KnowledgeSelector::from_config(catalog.clone(), &config.knowledge);
    let selection = selector.select_scored(text, &[]);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&selection)?);
    } else {
        print!("{}", render(catalog.version(), &selection));
    }
    Ok(())
}

fn render(version: &str, selection: &Selection<'_>) -> String {
    let mut out = format!("Knowledge catalog {version}\n");
    if selection.used_defaults {
        out.push_str("   No keyword matched, using defaults\n");
    }
    for entry in &selection.entries {
        out.push_str(&format!(
            "   {:>3}  {:<24} {}\n",
            entry.score, entry.fragment.id, entry.fragment.label
        ));
    }
    out
}
