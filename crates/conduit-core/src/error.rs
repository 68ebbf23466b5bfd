//! Error taxonomy for the controller side of Conduit
//!
//! Every failure that aborts a top-level operation is a [`ConduitError`].
//! Tool-level failures never show up here: the worker folds them into
//! ordinary content before they reach the wire.

use thiserror::Error;

/// Result type alias for Conduit operations
pub type ConduitResult<T> = Result<T, ConduitError>;

/// JSON-RPC code reported for a deadline that expired on the controller side.
pub const TIMEOUT_RPC_CODE: i64 = -32000;

/// JSON-RPC code used when a line cannot be parsed as JSON.
pub const PARSE_ERROR_RPC_CODE: i64 = -32700;

/// Controller-side errors
#[derive(Debug, Error, Clone)]
pub enum ConduitError {
    /// The worker failed to launch or exited during the startup grace window
    #[error("Worker failed to start: {message}")]
    Startup {
        message: String,
        /// Diagnostic lines drained from the worker before it died
        diagnostics: Vec<String>,
        exit_status: Option<String>,
        context: Option<String>,
    },

    /// Empty or malformed line, JSON parse failure, or explicit error field
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        /// JSON-RPC code, when the worker reported one
        code: Option<i64>,
        context: Option<String>,
    },

    /// The request deadline expired and the worker was killed
    #[error("Request '{method}' timed out after {timeout_ms} ms")]
    Timeout {
        method: String,
        timeout_ms: u64,
        context: Option<String>,
    },

    /// A result was missing an identifier the session needs
    #[error("Session error: {message}")]
    Session {
        message: String,
        context: Option<String>,
    },

    /// The completion loop requested more tool calls than allowed
    #[error("Completion loop exceeded {rounds} tool rounds")]
    LoopLimit {
        rounds: u32,
        context: Option<String>,
    },

    /// The channel already failed and must be restarted before reuse
    #[error("Channel is unusable after an earlier failure: {reason}")]
    ChannelFailed {
        reason: String,
        context: Option<String>,
    },

    /// IO errors on the worker pipes or the filesystem
    #[error("IO error: {message}")]
    Io {
        message: String,
        context: Option<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Serialization errors on the controller's own payloads
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },
}

impl ConduitError {
    /// Create a new Startup error
    pub fn startup(message: impl Into<String>, diagnostics: Vec<String>) -> Self {
        Self::Startup {
            message: message.into(),
            diagnostics,
            exit_status: None,
            context: None,
        }
    }

    /// Create a new Protocol error without a JSON-RPC code
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            code: None,
            context: None,
        }
    }

    /// Create a new Protocol error carrying the worker's JSON-RPC code
    pub fn protocol_with_code(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            code: Some(code),
            context: None,
        }
    }

    /// Create a new Timeout error
    pub fn timeout(method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            method: method.into(),
            timeout_ms,
            context: None,
        }
    }

    /// Create a new Session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new LoopLimit error
    pub fn loop_limit(rounds: u32) -> Self {
        Self::LoopLimit {
            rounds,
            context: None,
        }
    }

    /// Create a new ChannelFailed error
    pub fn channel_failed(reason: impl Into<String>) -> Self {
        Self::ChannelFailed {
            reason: reason.into(),
            context: None,
        }
    }

    /// Create a new Io error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new Json error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
            context: None,
        }
    }

    /// Attach the exit status to a Startup error; other variants are returned unchanged
    pub fn with_exit_status(mut self, status: impl Into<String>) -> Self {
        if let Self::Startup { exit_status, .. } = &mut self {
            *exit_status = Some(status.into());
        }
        self
    }

    /// Add context to any error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let ctx = Some(context.into());
        match &mut self {
            Self::Startup { context: c, .. } => *c = ctx,
            Self::Protocol { context: c, .. } => *c = ctx,
            Self::Timeout { context: c, .. } => *c = ctx,
            Self::Session { context: c, .. } => *c = ctx,
            Self::LoopLimit { context: c, .. } => *c = ctx,
            Self::ChannelFailed { context: c, .. } => *c = ctx,
            Self::Io { context: c, .. } => *c = ctx,
            Self::Config { context: c, .. } => *c = ctx,
            Self::Json { context: c, .. } => *c = ctx,
        }
        self
    }

    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Startup { .. } => "CONDUIT_STARTUP",
            Self::Protocol { .. } => "CONDUIT_PROTOCOL",
            Self::Timeout { .. } => "CONDUIT_TIMEOUT",
            Self::Session { .. } => "CONDUIT_SESSION",
            Self::LoopLimit { .. } => "CONDUIT_LOOP_LIMIT",
            Self::ChannelFailed { .. } => "CONDUIT_CHANNEL_FAILED",
            Self::Io { .. } => "CONDUIT_IO",
            Self::Config { .. } => "CONDUIT_CONFIG",
            Self::Json { .. } => "CONDUIT_JSON",
        }
    }

    /// JSON-RPC error code associated with this failure, if any
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Timeout { .. } => Some(TIMEOUT_RPC_CODE),
            Self::Protocol { code, .. } => *code,
            _ => None,
        }
    }

    /// Get optional context about the error
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Startup { context, .. } => context.as_deref(),
            Self::Protocol { context, .. } => context.as_deref(),
            Self::Timeout { context, .. } => context.as_deref(),
            Self::Session { context, .. } => context.as_deref(),
            Self::LoopLimit { context, .. } => context.as_deref(),
            Self::ChannelFailed { context, .. } => context.as_deref(),
            Self::Io { context, .. } => context.as_deref(),
            Self::Config { context, .. } => context.as_deref(),
            Self::Json { context, .. } => context.as_deref(),
        }
    }

    /// Diagnostic lines captured from the worker, if this error carries any
    pub fn diagnostics(&self) -> &[String] {
        match self {
            Self::Startup { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }

    /// Whether this failure leaves the worker channel unusable.
    ///
    /// Config and Json errors are raised before anything reaches the wire.
    pub fn poisons_channel(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::Json { .. })
    }
}

impl From<serde_json::Error> for ConduitError {
    fn from(err: serde_json::Error) -> Self {
        Self::json(err.to_string())
    }
}

impl From<std::io::Error> for ConduitError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_carries_synthetic_rpc_code() {
        let err = ConduitError::timeout("getCompletion", 1500);
        assert_eq!(err.rpc_code(), Some(-32000));
        assert_eq!(err.error_code(), "CONDUIT_TIMEOUT");
        assert!(err.to_string().contains("getCompletion"));
    }

    #[test]
    fn test_startup_error_keeps_diagnostics() {
        let err = ConduitError::startup(
            "worker exited during startup",
            vec!["missing API key".to_string()],
        )
        .with_exit_status("exit status: 1");

        assert_eq!(err.diagnostics(), ["missing API key".to_string()]);
        match err {
            ConduitError::Startup { exit_status, .. } => {
                assert_eq!(exit_status.as_deref(), Some("exit status: 1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_with_context() {
        let err = ConduitError::session("missing sessionId").with_context("createSession");
        assert_eq!(err.context(), Some("createSession"));
    }

    #[test]
    fn test_poisoning_classification() {
        assert!(ConduitError::protocol("bad line").poisons_channel());
        assert!(ConduitError::loop_limit(3).poisons_channel());
        assert!(!ConduitError::config("bad file").poisons_channel());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ConduitError = io.into();
        assert_eq!(err.error_code(), "CONDUIT_IO");
    }
}
