//! Request/response behaviour over scripted workers
#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use common::{SILENT_WORKER, WEATHER_WORKER, process_alive, script_worker};
use conduit_core::config::WorkerConfig;
use conduit_core::error::{PARSE_ERROR_RPC_CODE, TIMEOUT_RPC_CODE};
use conduit_core::{ConduitError, ProcessSupervisor, RpcChannel, WorkerState};
use serde_json::json;
use tempfile::TempDir;

fn channel(config: WorkerConfig, timeout: Duration) -> RpcChannel {
    RpcChannel::new(ProcessSupervisor::new(config, 32), timeout)
}

#[tokio::test]
async fn test_send_auto_starts_and_correlates_ids() {
    let dir = TempDir::new().unwrap();
    let mut channel = channel(
        script_worker(&dir, "weather.sh", WEATHER_WORKER),
        Duration::from_secs(5),
    );
    assert_eq!(channel.state(), WorkerState::NotStarted);

    let first = channel.send("createSession", json!({})).await.unwrap();
    assert_eq!(first.id, Some(1));
    assert_eq!(first.result, Some(json!({"sessionId": "abc"})));
    assert_eq!(channel.state(), WorkerState::Running);

    let second = channel.send("listTools", json!({})).await.unwrap();
    assert_eq!(second.id, Some(2));
    assert!(channel.pending().is_none());
    assert_eq!(channel.next_id(), 3);

    channel.shutdown().await;
    assert_eq!(channel.state(), WorkerState::Stopped);
}

#[tokio::test]
async fn test_ids_restart_after_fresh_start() {
    let dir = TempDir::new().unwrap();
    let mut channel = channel(
        script_worker(&dir, "weather.sh", WEATHER_WORKER),
        Duration::from_secs(5),
    );

    channel.send("createSession", json!({})).await.unwrap();
    channel.send("createSession", json!({})).await.unwrap();
    channel.shutdown().await;

    let response = channel.send("createSession", json!({})).await.unwrap();
    assert_eq!(response.id, Some(1));
    channel.shutdown().await;
}

#[tokio::test]
async fn test_timeout_kills_unresponsive_worker() {
    let dir = TempDir::new().unwrap();
    let mut channel = channel(
        script_worker(&dir, "silent.sh", SILENT_WORKER),
        Duration::from_millis(300),
    );
    channel.restart().await.unwrap();
    let pid = channel.pid().unwrap();

    let started = Instant::now();
    let err = channel.send("getCompletion", json!({})).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(err, ConduitError::Timeout { .. }), "got {err:?}");
    assert_eq!(err.rpc_code(), Some(TIMEOUT_RPC_CODE));
    assert_eq!(channel.state(), WorkerState::Failed);
    assert!(channel.pending().is_none());
    assert!(!process_alive(pid));
}

#[tokio::test]
async fn test_malformed_line_fails_channel() {
    let dir = TempDir::new().unwrap();
    let body = "while IFS= read -r line; do echo '{not json'; done\n";
    let mut channel = channel(script_worker(&dir, "garbage.sh", body), Duration::from_secs(5));

    let err = channel.send("createSession", json!({})).await.unwrap_err();
    assert!(matches!(err, ConduitError::Protocol { .. }), "got {err:?}");
    assert!(channel.is_failed());
    assert_eq!(channel.state(), WorkerState::Failed);

    let started = Instant::now();
    let err = channel.send("createSession", json!({})).await.unwrap_err();
    assert!(matches!(err, ConduitError::ChannelFailed { .. }), "got {err:?}");
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn test_non_utf8_response_is_protocol_error() {
    let dir = TempDir::new().unwrap();
    let body = "while IFS= read -r line; do printf '\\377\\n'; done\n";
    let mut channel = channel(script_worker(&dir, "binary.sh", body), Duration::from_secs(5));

    let err = channel.send("listTools", json!({})).await.unwrap_err();
    assert!(matches!(err, ConduitError::Protocol { .. }), "got {err:?}");
    assert_eq!(err.error_code(), "CONDUIT_PROTOCOL");
    assert_eq!(err.rpc_code(), Some(PARSE_ERROR_RPC_CODE));
    assert_eq!(channel.state(), WorkerState::Failed);

    let started = Instant::now();
    let err = channel.send("listTools", json!({})).await.unwrap_err();
    assert!(matches!(err, ConduitError::ChannelFailed { .. }), "got {err:?}");
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn test_restart_recovers_failed_channel() {
    let dir = TempDir::new().unwrap();
    let body = "IFS= read -r line\necho '{not json'\nwhile IFS= read -r line; do :; done\n";
    let mut channel = channel(script_worker(&dir, "once.sh", body), Duration::from_secs(5));

    assert!(channel.send("listTools", json!({})).await.is_err());
    assert!(channel.is_failed());

    channel.restart().await.unwrap();
    assert!(!channel.is_failed());
    assert_eq!(channel.state(), WorkerState::Running);
    assert_eq!(channel.next_id(), 1);
    channel.shutdown().await;
}

#[tokio::test]
async fn test_error_response_fails_channel() {
    let dir = TempDir::new().unwrap();
    let mut channel = channel(
        script_worker(&dir, "weather.sh", WEATHER_WORKER),
        Duration::from_secs(5),
    );

    let err = channel.send("frobnicate", json!({"sessionId": "abc"})).await.unwrap_err();
    assert_eq!(err.rpc_code(), Some(-32601));
    assert!(channel.is_failed());
}

#[tokio::test]
async fn test_mismatched_id_fails_channel() {
    let dir = TempDir::new().unwrap();
    let body = "while IFS= read -r line; do echo '{\"jsonrpc\":\"2.0\",\"result\":{},\"id\":99}'; done\n";
    let mut channel = channel(script_worker(&dir, "liar.sh", body), Duration::from_secs(5));

    let err = channel.send("listTools", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("does not match"), "got {err}");
    assert_eq!(channel.state(), WorkerState::Failed);
}

#[tokio::test]
async fn test_blank_line_fails_channel() {
    let dir = TempDir::new().unwrap();
    let body = "while IFS= read -r line; do echo; done\n";
    let mut channel = channel(script_worker(&dir, "blank.sh", body), Duration::from_secs(5));

    let err = channel.send("listTools", json!({})).await.unwrap_err();
    assert!(matches!(err, ConduitError::Protocol { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_eof_reports_last_diagnostics() {
    let dir = TempDir::new().unwrap();
    let body = "IFS= read -r line\necho 'missing API key' >&2\nexit 1\n";
    let mut channel = channel(script_worker(&dir, "quitter.sh", body), Duration::from_secs(5));

    let err = channel.send("createSession", json!({})).await.unwrap_err();
    assert!(matches!(err, ConduitError::Protocol { .. }), "got {err:?}");
    assert!(channel.is_failed());
}

#[tokio::test]
async fn test_result_schema_mismatch_names_method() {
    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Expected {
        count: u32,
    }

    let dir = TempDir::new().unwrap();
    let mut channel = channel(
        script_worker(&dir, "weather.sh", WEATHER_WORKER),
        Duration::from_secs(5),
    );

    let err = channel
        .call::<Expected>("createSession", json!({}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("createSession"), "got {err}");
    assert!(channel.is_failed());
}

#[tokio::test]
async fn test_startup_failure_through_channel() {
    let dir = TempDir::new().unwrap();
    let config = script_worker(&dir, "boom.sh", "echo boom >&2\nexit 3\n")
        .with_startup_grace(Duration::from_millis(500));
    let mut channel = channel(config, Duration::from_secs(5));

    let err = channel.send("createSession", json!({})).await.unwrap_err();
    assert!(err.diagnostics().iter().any(|l| l.contains("boom")));
    assert_eq!(channel.state(), WorkerState::Failed);
}
