//! Environment variable overrides
//!
//! Variables use the `CONDUIT_` prefix. The lookup is injected so callers
//! decide where values come from; business logic never reads the process
//! environment on its own.

use super::model::ConduitConfig;
use crate::error::{ConduitError, ConduitResult};
use std::str::FromStr;

pub const ENV_WORKER_COMMAND: &str = "CONDUIT_WORKER_COMMAND";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CONDUIT_REQUEST_TIMEOUT_SECS";
pub const ENV_MAX_TOOL_ROUNDS: &str = "CONDUIT_MAX_TOOL_ROUNDS";
pub const ENV_LOG_LEVEL: &str = "CONDUIT_LOG_LEVEL";

/// Apply overrides from the real process environment
pub fn apply_process_env(config: &mut ConduitConfig) -> ConduitResult<()> {
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides using an arbitrary lookup
pub fn apply_env_overrides<F>(config: &mut ConduitConfig, lookup: F) -> ConduitResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(command) = lookup(ENV_WORKER_COMMAND).filter(|c| !c.trim().is_empty()) {
        config.worker.command = command;
    }

    if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
        config.rpc.request_timeout_secs = parse_value(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
    }

    if let Some(raw) = lookup(ENV_MAX_TOOL_ROUNDS) {
        config.session.max_tool_rounds = parse_value(ENV_MAX_TOOL_ROUNDS, &raw)?;
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|l| !l.trim().is_empty()) {
        config.logging.level = level;
    }

    Ok(())
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> ConduitResult<T> {
    raw.trim().parse().map_err(|_| {
        ConduitError::config(format!("Invalid {} value", key))
            .with_context(format!("Parsing '{}'", raw))
    })
}
