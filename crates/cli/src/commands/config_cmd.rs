//! `bizpilot config`: configuration management commands.

use std::path::Path;

use bizpilot_config::AppConfig;

use super::load_config;

pub fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match load_config(config_path) {
        Ok(config) => {
            println!("   Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No API key set (set BIZPILOT_API_KEY or ANTHROPIC_API_KEY)");
            }
            if config.gateway.host == "0.0.0.0" {
                warnings.push("Gateway bound to 0.0.0.0; keep it behind the auth proxy");
            }
            if config.stream.chunk_delay_ms > 1000 {
                warnings.push("stream.chunk_delay_ms above one second will feel stalled");
            }

            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            println!("   Model:      {}", config.provider.model);
            println!("   Iterations: {}", config.agent.max_iterations);
            println!("   Gateway:    {}:{}", config.gateway.host, config.gateway.port);
            println!("   Database:   {}", config.database.url);
            println!(
                "   Knowledge:  {}",
                config
                    .knowledge
                    .catalog_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "built-in".into())
            );
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let dir = AppConfig::config_dir();
    let path = dir.join("config.toml");
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    std::fs::create_dir_all(&dir)?;
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn path() {
    println!("{}", AppConfig::config_dir().join("config.toml").display());
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_path_is_valid() {
        let path = bizpilot_config::AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains(".bizpilot"));
    }
}
