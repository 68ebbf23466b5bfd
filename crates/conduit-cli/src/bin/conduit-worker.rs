//! Conduit worker: serves weather tools over stdio JSON-RPC
//!
//! stdout carries protocol responses only. Logs go to stderr, where the
//! controller drains them.

use anyhow::Context;
use conduit_tools::{WorkerSettings, default_server};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .compact()
        .init();

    let settings = WorkerSettings::load();
    if !settings.has_api_key() {
        warn!("No weather API key configured; lookups will report unavailable data");
    }
    info!(?settings, "Worker starting");

    let mut server = default_server(settings).context("Failed to build weather tools")?;
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = server.run(stdin, stdout) => {
            result.context("Worker I/O failed")?;
        }
        _ = terminate() => {
            info!("Termination requested, worker exiting");
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(_) => std::future::pending::<()>().await,
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}
