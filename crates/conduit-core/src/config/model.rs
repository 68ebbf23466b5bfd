//! Configuration model

use super::defaults;
use crate::error::{ConduitError, ConduitResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn default_command() -> String {
    defaults::worker::COMMAND.to_string()
}

fn default_startup_grace_ms() -> u64 {
    defaults::worker::STARTUP_GRACE_MS
}

fn default_shutdown_grace_ms() -> u64 {
    defaults::worker::SHUTDOWN_GRACE_MS
}

fn default_request_timeout_secs() -> u64 {
    defaults::rpc::REQUEST_TIMEOUT_SECS
}

fn default_max_tool_rounds() -> u32 {
    defaults::session::MAX_TOOL_ROUNDS
}

fn default_stderr_buffer_lines() -> usize {
    defaults::diagnostics::STDERR_BUFFER_LINES
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Top-level configuration, loaded once and passed down explicitly
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConduitConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConduitConfig {
    /// Merge with another config (other takes precedence where it differs from defaults)
    pub fn merge(&mut self, other: ConduitConfig) {
        self.worker.merge(other.worker);
        self.rpc.merge(other.rpc);
        self.session.merge(other.session);
        self.diagnostics.merge(other.diagnostics);
        self.logging.merge(other.logging);
    }

    /// Reject settings the controller cannot run with
    pub fn validate(&self) -> ConduitResult<()> {
        if self.worker.command.trim().is_empty() {
            return Err(ConduitError::config("worker.command must not be empty"));
        }
        if self.rpc.request_timeout_secs == 0 {
            return Err(ConduitError::config("rpc.request_timeout_secs must be positive"));
        }
        if self.session.max_tool_rounds == 0 {
            return Err(ConduitError::config("session.max_tool_rounds must be positive"));
        }
        if self.diagnostics.stderr_buffer_lines == 0 {
            return Err(ConduitError::config(
                "diagnostics.stderr_buffer_lines must be positive",
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConduitError::config(format!(
                "Unknown logging.level '{}' (expected one of {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConduitError::config(format!(
                "Unknown logging.format '{}' (expected one of {})",
                self.logging.format,
                LOG_FORMATS.join(", ")
            )));
        }
        Ok(())
    }
}

/// How to launch the worker process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Command to spawn
    #[serde(default = "default_command")]
    pub command: String,
    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Working directory
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Window in which an exit counts as a failed start
    #[serde(default = "default_startup_grace_ms")]
    pub startup_grace_ms: u64,
    /// Wait after SIGTERM before killing
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            startup_grace_ms: default_startup_grace_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl WorkerConfig {
    /// Create a config for an arbitrary command
    pub fn command(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            ..Self::default()
        }
    }

    /// Add environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the startup grace window
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace_ms = grace.as_millis() as u64;
        self
    }

    /// Set the shutdown grace window
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_ms = grace.as_millis() as u64;
        self
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Render the command line for logs and error messages
    pub fn display_command(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Merge with another worker config
    pub fn merge(&mut self, other: WorkerConfig) {
        if other.command != default_command() && !other.command.is_empty() {
            self.command = other.command;
        }
        if !other.args.is_empty() {
            self.args = other.args;
        }
        for (key, value) in other.env {
            self.env.insert(key, value);
        }
        if other.cwd.is_some() {
            self.cwd = other.cwd;
        }
        if other.startup_grace_ms != default_startup_grace_ms() {
            self.startup_grace_ms = other.startup_grace_ms;
        }
        if other.shutdown_grace_ms != default_shutdown_grace_ms() {
            self.shutdown_grace_ms = other.shutdown_grace_ms;
        }
    }
}

/// Request channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Deadline per request in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn merge(&mut self, other: RpcConfig) {
        if other.request_timeout_secs != default_request_timeout_secs() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }
}

/// Completion loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum tool executions per completion
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl SessionConfig {
    pub fn merge(&mut self, other: SessionConfig) {
        if other.max_tool_rounds != default_max_tool_rounds() {
            self.max_tool_rounds = other.max_tool_rounds;
        }
    }
}

/// Worker stderr capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Lines retained in the ring buffer
    #[serde(default = "default_stderr_buffer_lines")]
    pub stderr_buffer_lines: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            stderr_buffer_lines: default_stderr_buffer_lines(),
        }
    }
}

impl DiagnosticsConfig {
    pub fn merge(&mut self, other: DiagnosticsConfig) {
        if other.stderr_buffer_lines != default_stderr_buffer_lines() {
            self.stderr_buffer_lines = other.stderr_buffer_lines;
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["json", "pretty", "compact"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Merge with another logging config
    pub fn merge(&mut self, other: LoggingConfig) {
        if !other.level.is_empty() && other.level != default_log_level() {
            self.level = other.level;
        }
        if !other.format.is_empty() && other.format != default_log_format() {
            self.format = other.format;
        }
    }
}
