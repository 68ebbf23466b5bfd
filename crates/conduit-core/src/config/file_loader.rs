//! File-based configuration loading

use super::model::ConduitConfig;
use crate::error::{ConduitError, ConduitResult};
use std::fs;
use std::path::Path;

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: &Path) -> ConduitResult<ConduitConfig> {
    if !path.exists() {
        return Ok(ConduitConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        ConduitError::config(format!("Failed to read config file: {}", e))
            .with_context(format!("Reading configuration from '{}'", path.display()))
    })?;

    parse_config(&content, path)
}

fn parse_config(content: &str, path: &Path) -> ConduitResult<ConduitConfig> {
    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(content).map_err(|e| {
            ConduitError::config(format!("Failed to parse TOML config: {}", e))
                .with_context(format!("Deserializing '{}'", path.display()))
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(content).map_err(|e| {
            ConduitError::config(format!("Failed to parse YAML config: {}", e))
                .with_context(format!("Deserializing '{}'", path.display()))
        })?,
        _ => serde_json::from_str(content).map_err(|e| {
            ConduitError::config(format!("Failed to parse JSON config: {}", e))
                .with_context(format!("Deserializing '{}'", path.display()))
        })?,
    };

    Ok(config)
}

/// Serialize a config in the format implied by the file extension
pub fn render_config(config: &ConduitConfig, path: &Path) -> ConduitResult<String> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::to_string_pretty(config)
            .map_err(|e| ConduitError::config(format!("Failed to render TOML config: {}", e))),
        Some("yaml") | Some("yml") => serde_yaml::to_string(config)
            .map_err(|e| ConduitError::config(format!("Failed to render YAML config: {}", e))),
        _ => serde_json::to_string_pretty(config)
            .map_err(|e| ConduitError::config(format!("Failed to render JSON config: {}", e))),
    }
}
