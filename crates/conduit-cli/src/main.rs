//! Conduit controller CLI
//!
//! Spawns a tool-serving worker, talks JSON-RPC to it over its stdio pipes
//! and prints the answer. The worker never outlives this process: every
//! path out of `main` drops the supervisor, which kills the child.
//!
//! # Modes
//!
//! - `conduit "weather in Taipei"` runs the completion loop.
//! - `conduit -c Taipei` or `conduit -d --tool NAME --args JSON` calls one
//!   tool directly.
//! - `conduit tools` and `conduit config ...` are utilities.

mod args;
mod commands;
mod console;
mod logging;
mod router;

use clap::Parser;
use std::process::ExitCode;

pub use args::{Cli, Commands, ConfigAction};

/// Exit code after SIGINT/SIGTERM
const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tokio::select! {
        result = router::route(cli) => match result {
            Ok(code) => code,
            Err(err) => {
                console::report_error(&err);
                ExitCode::FAILURE
            }
        },
        _ = shutdown_signal() => {
            tracing::warn!("Interrupted, stopping worker");
            ExitCode::from(INTERRUPTED)
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
