//! Free-text query through the completion loop

use crate::console::CliConsole;
use conduit_core::{ConduitConfig, SessionManager};
use tracing::info;

/// Post the query, run whatever tools the worker asks for, print the answer
pub async fn execute(config: &ConduitConfig, query: &str, console: &CliConsole) -> anyhow::Result<()> {
    info!(worker = %config.worker.display_command(), "Running query");

    let mut manager = SessionManager::from_config(config);
    let outcome = manager.query(query).await?;

    console.print_tool_calls(&outcome.tool_calls);
    console.answer(&outcome.content);
    Ok(())
}
