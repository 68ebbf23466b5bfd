//! CLI argument definitions using clap
//!
//! - conduit "question"             # Query through the completion loop
//! - conduit -c Taipei              # Direct weather lookup
//! - conduit -d --tool T --args J   # Direct call of any tool
//! - conduit tools / config         # Utility commands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "conduit.toml";

/// Tool used by direct mode when `--tool` is not given
pub const DEFAULT_DIRECT_TOOL: &str = "get_weather_by_city";

#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(about = "Conduit - drive a tool-serving worker over stdio JSON-RPC")]
#[command(
    long_about = r#"Conduit - drive a tool-serving worker over stdio JSON-RPC

USAGE:
  conduit "weather in Taipei"            # Ask through the completion loop
  conduit -c Taipei                      # Current weather, no loop
  conduit -d --tool get_forecast --args '{"city":"Paris","days":3}'

UTILITY COMMANDS:
  conduit tools                          # List the worker's tools
  conduit config init                    # Create config file
  conduit config show                    # Show effective config"#
)]
#[command(version)]
pub struct Cli {
    /// Free-text query (or the city in direct mode)
    pub query: Option<String>,

    /// Enable debug logging, including the worker's stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Request timeout in seconds
    #[arg(long, short = 't', value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Call one tool directly instead of running the completion loop
    #[arg(long, short = 'd')]
    pub direct: bool,

    /// Tool to call in direct mode
    #[arg(long, default_value = DEFAULT_DIRECT_TOOL)]
    pub tool: String,

    /// Raw JSON arguments for direct mode
    #[arg(long, value_name = "JSON")]
    pub args: Option<String>,

    /// Current weather for a city (direct mode shorthand)
    #[arg(long, short = 'c', value_name = "NAME")]
    pub city: Option<String>,

    /// Maximum tool executions per completion
    #[arg(long, value_name = "N")]
    pub max_tool_rounds: Option<u32>,

    /// Worker command line, e.g. "python3 worker.py"
    #[arg(long, value_name = "CMD")]
    pub worker: Option<String>,

    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the tools the worker exposes
    Tools,

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Display the effective configuration (file plus environment)
    Show,

    /// Validate configuration file for errors
    Validate,

    /// Create a new configuration file with defaults
    Init {
        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_direct_flags() {
        let cli = Cli::parse_from([
            "conduit",
            "-d",
            "--tool",
            "get_forecast",
            "--args",
            r#"{"city":"Paris"}"#,
            "-t",
            "5",
        ]);
        assert!(cli.direct);
        assert_eq!(cli.tool, "get_forecast");
        assert_eq!(cli.timeout, Some(5));
        assert!(cli.query.is_none());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["conduit", "weather in Taipei"]);
        assert_eq!(cli.query.as_deref(), Some("weather in Taipei"));
        assert_eq!(cli.tool, DEFAULT_DIRECT_TOOL);
        assert_eq!(cli.config_file, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::parse_from(["conduit", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Init { force: true }
            })
        ));
    }
}
