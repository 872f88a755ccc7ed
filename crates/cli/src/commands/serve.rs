//! `bizpilot serve`: start the HTTP gateway.

use std::path::Path;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("BizPilot Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.provider.model);
    println!("   Database:  {}", config.database.url);

    bizpilot_gateway::start(config).await?;

    Ok(())
}
