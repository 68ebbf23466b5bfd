//! Centralized default values
//!
//! All values can be overridden via configuration.

use std::time::Duration;

/// Worker process lifecycle defaults
pub mod worker {
    use super::*;

    /// Worker executable looked up next to the controller or on PATH
    pub const COMMAND: &str = "conduit-worker";

    /// How long a fresh worker must stay alive to count as started (500 ms)
    pub const STARTUP_GRACE_MS: u64 = 500;

    /// How long a terminated worker may take to exit before it is killed (500 ms)
    pub const SHUTDOWN_GRACE_MS: u64 = 500;

    /// Get startup grace as Duration
    pub fn startup_grace() -> Duration {
        Duration::from_millis(STARTUP_GRACE_MS)
    }

    /// Get shutdown grace as Duration
    pub fn shutdown_grace() -> Duration {
        Duration::from_millis(SHUTDOWN_GRACE_MS)
    }
}

/// JSON-RPC channel defaults
pub mod rpc {
    use super::*;

    /// Default deadline for a single request (30 seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Get request timeout as Duration
    pub fn request_timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Session loop defaults
pub mod session {
    /// Maximum tool executions per completion
    pub const MAX_TOOL_ROUNDS: u32 = 8;
}

/// Diagnostic capture defaults
pub mod diagnostics {
    /// Lines of worker stderr retained in the ring buffer
    pub const STDERR_BUFFER_LINES: usize = 200;
    /// Longest stderr line kept, in bytes; the remainder is dropped
    pub const MAX_LINE_BYTES: usize = 4096;
}
