//! Command routing logic for CLI
//!
//! Configuration is resolved once here (file, environment, flags) and then
//! handed to the command that runs.

use crate::args::{Cli, Commands, ConfigAction, DEFAULT_DIRECT_TOOL};
use crate::console::CliConsole;
use crate::{commands, logging};
use anyhow::bail;
use clap::CommandFactory;
use conduit_core::config::{LoggingConfig, defaults, load_config};
use conduit_core::{ConduitConfig, WorkerConfig};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> anyhow::Result<ExitCode> {
    let console = CliConsole::new(cli.verbose);

    if let Some(Commands::Config { action }) = &cli.command {
        logging::init(&LoggingConfig::default(), cli.verbose)?;
        match action {
            ConfigAction::Show => commands::config::show(&cli.config_file, &console).await?,
            ConfigAction::Validate => {
                commands::config::validate(&cli.config_file, &console).await?
            }
            ConfigAction::Init { force } => {
                commands::config::init(&cli.config_file, *force, &console).await?
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = effective_config(&cli)?;
    logging::init(&config.logging, cli.verbose)?;
    debug!(?config, "Effective configuration");

    if let Some(Commands::Tools) = &cli.command {
        commands::tools::show_tools(&config, &console).await?;
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(city) = &cli.city {
        let arguments = json!({"city": city});
        commands::direct::execute(&config, DEFAULT_DIRECT_TOOL, arguments, &console).await?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.direct {
        if cli.args.is_none() && cli.query.is_none() {
            return usage();
        }
        let arguments = commands::direct::build_arguments(cli.args.as_deref(), cli.query.as_deref())?;
        commands::direct::execute(&config, &cli.tool, arguments, &console).await?;
        return Ok(ExitCode::SUCCESS);
    }

    match cli.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => {
            commands::query::execute(&config, query, &console).await?;
            Ok(ExitCode::SUCCESS)
        }
        _ => usage(),
    }
}

/// Print help to stderr and fail
fn usage() -> anyhow::Result<ExitCode> {
    Cli::command().write_help(&mut std::io::stderr())?;
    eprintln!();
    Ok(ExitCode::FAILURE)
}

/// File, then `CONDUIT_*` environment, then command-line flags
pub fn effective_config(cli: &Cli) -> anyhow::Result<ConduitConfig> {
    let mut config = load_config(Some(&cli.config_file))?;
    apply_cli_overrides(&mut config, cli)?;
    resolve_worker_command(&mut config.worker);
    config.validate()?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut ConduitConfig, cli: &Cli) -> anyhow::Result<()> {
    if let Some(secs) = cli.timeout {
        config.rpc.request_timeout_secs = secs;
    }
    if let Some(rounds) = cli.max_tool_rounds {
        config.session.max_tool_rounds = rounds;
    }
    if let Some(worker) = &cli.worker {
        let mut parts = worker.split_whitespace().map(str::to_string);
        let Some(command) = parts.next() else {
            bail!("--worker must not be empty");
        };
        config.worker.command = command;
        config.worker.args = parts.collect();
    }
    Ok(())
}

/// Prefer a worker binary installed next to this executable over a PATH lookup
fn resolve_worker_command(worker: &mut WorkerConfig) {
    if worker.command != defaults::worker::COMMAND {
        return;
    }
    if let Some(sibling) = sibling_worker() {
        debug!(path = %sibling.display(), "Using worker next to the controller");
        worker.command = sibling.to_string_lossy().into_owned();
    }
}

fn sibling_worker() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let name = format!("{}{}", defaults::worker::COMMAND, std::env::consts::EXE_SUFFIX);
    let candidate = exe.with_file_name(name);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_flag_overrides() {
        let cli = Cli::parse_from([
            "conduit",
            "-t",
            "7",
            "--max-tool-rounds",
            "2",
            "--worker",
            "python3 worker.py --quiet",
            "hi",
        ]);
        let mut config = ConduitConfig::default();
        apply_cli_overrides(&mut config, &cli).unwrap();

        assert_eq!(config.rpc.request_timeout_secs, 7);
        assert_eq!(config.session.max_tool_rounds, 2);
        assert_eq!(config.worker.command, "python3");
        assert_eq!(config.worker.args, vec!["worker.py", "--quiet"]);
    }

    #[test]
    fn test_blank_worker_rejected() {
        let cli = Cli::parse_from(["conduit", "--worker", "  ", "hi"]);
        let mut config = ConduitConfig::default();
        assert!(apply_cli_overrides(&mut config, &cli).is_err());
    }

    #[test]
    fn test_explicit_worker_not_resolved() {
        let mut worker = WorkerConfig::command("sh", vec!["w.sh".to_string()]);
        resolve_worker_command(&mut worker);
        assert_eq!(worker.command, "sh");
    }
}
