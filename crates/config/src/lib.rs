//! Configuration loading, validation, and management for BizPilot.
//!
//! Loads configuration from `~/.bizpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.bizpilot/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion service settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Agentic loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Simulated streaming pacing
    #[serde(default)]
    pub stream: StreamConfig,

    /// Knowledge selection
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Datastore configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("agent", &self.agent)
            .field("stream", &self.stream)
            .field("knowledge", &self.knowledge)
            .field("gateway", &self.gateway)
            .field("database", &self.database)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Completion calls allowed per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Invocations executed per assistant turn; the rest get error results
    #[serde(default = "default_max_tools_per_turn")]
    pub max_tools_per_turn: usize,

    /// Run one turn's invocations concurrently
    #[serde(default)]
    pub parallel_tool_calls: bool,
}

fn default_max_iterations() -> usize {
    6
}
fn default_max_tools_per_turn() -> usize {
    8
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_tools_per_turn: default_max_tools_per_turn(),
            parallel_tool_calls: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Characters per text chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
}

fn default_chunk_size() -> usize {
    12
}
fn default_chunk_delay_ms() -> u64 {
    15
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// TOML catalog replacing the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

fn default_max_results() -> usize {
    5
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            catalog_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    format!(
        "sqlite://{}",
        AppConfig::config_dir().join("bizpilot.db").display()
    )
}
fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.bizpilot/config.toml).
    ///
    /// Also checks environment variables:
    /// - `BIZPILOT_API_KEY` (highest priority), then `ANTHROPIC_API_KEY`
    /// - `BIZPILOT_MODEL`
    /// - `BIZPILOT_DATABASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn apply_env(&mut self) {
        if let Some(key) = std::env::var("BIZPILOT_API_KEY")
            .ok()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.is_empty())
        {
            self.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("BIZPILOT_MODEL") {
            self.provider.model = model;
        }

        if let Ok(url) = std::env::var("BIZPILOT_DATABASE_URL") {
            self.database.url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".bizpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=20).contains(&self.agent.max_iterations) {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be between 1 and 20".into(),
            ));
        }
        if self.agent.max_tools_per_turn == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tools_per_turn must be at least 1".into(),
            ));
        }
        if self.stream.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "stream.chunk_size must be at least 1".into(),
            ));
        }
        if !(1..=5).contains(&self.knowledge.max_results) {
            return Err(ConfigError::ValidationError(
                "knowledge.max_results must be between 1 and 5".into(),
            ));
        }
        if self.provider.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "provider.max_tokens must be > 0".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for bizpilot_core::Error {
    fn from(e: ConfigError) -> Self {
        bizpilot_core::Error::Config {
            message: e.to_string(),
        }
    }
}
