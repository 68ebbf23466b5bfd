//! Tools command implementation

use crate::console::CliConsole;
use conduit_core::{ConduitConfig, SessionManager};

/// Ask the worker for its tools and print them
pub async fn show_tools(config: &ConduitConfig, console: &CliConsole) -> anyhow::Result<()> {
    let mut manager = SessionManager::from_config(config);
    let tools = manager.describe_tools().await?;

    console.print_header("Available Tools");
    console.print_tools(&tools);
    console.info(&format!("Total tools available: {}", tools.len()));
    Ok(())
}
