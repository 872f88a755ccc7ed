pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod knowledge;
pub mod migrate;
pub mod serve;

use std::path::Path;

use bizpilot_config::{AppConfig, ConfigError};

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
}
