//! Configuration management commands

use crate::console::CliConsole;
use anyhow::{Context, bail};
use conduit_core::ConduitConfig;
use conduit_core::config::{load_config, load_from_file, render_config};
use std::path::Path;

/// Show the effective configuration: file plus environment overrides
pub async fn show(config_file: &Path, console: &CliConsole) -> anyhow::Result<()> {
    console.print_header("Configuration");

    if config_file.exists() {
        console.success(&format!("Loaded configuration from: {}", config_file.display()));
    } else {
        console.warn(&format!(
            "Configuration file not found: {}",
            config_file.display()
        ));
        console.info("Using default configuration");
    }

    let config = load_config(Some(config_file))?;
    console.answer(render_config(&config, config_file)?.trim_end());
    Ok(())
}

/// Parse and check a configuration file
pub async fn validate(config_file: &Path, console: &CliConsole) -> anyhow::Result<()> {
    console.print_header("Configuration Validation");

    if !config_file.exists() {
        bail!("Configuration file not found: {}", config_file.display());
    }

    let config = load_from_file(config_file)?;
    console.success("Configuration file loaded successfully");
    config.validate()?;
    console.success("Configuration is valid");

    console.info(&format!("Worker: {}", config.worker.display_command()));
    console.info(&format!(
        "Request timeout: {}s",
        config.rpc.request_timeout_secs
    ));
    console.info(&format!("Max tool rounds: {}", config.session.max_tool_rounds));
    Ok(())
}

/// Write a configuration file holding the defaults
pub async fn init(config_file: &Path, force: bool, console: &CliConsole) -> anyhow::Result<()> {
    console.print_header("Configuration Initialization");

    if config_file.exists() && !force {
        console.info("Use --force to overwrite");
        bail!(
            "Configuration file already exists: {}",
            config_file.display()
        );
    }

    let rendered = render_config(&ConduitConfig::default(), config_file)?;
    tokio::fs::write(config_file, rendered)
        .await
        .with_context(|| format!("Failed to write {}", config_file.display()))?;

    console.success(&format!(
        "Created configuration file: {}",
        config_file.display()
    ));
    Ok(())
}
