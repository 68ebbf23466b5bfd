//! Session handling and the completion loop over scripted workers
#![cfg(unix)]

mod common;

use std::time::Duration;

use common::{SILENT_WORKER, WEATHER_WORKER, script_worker};
use conduit_core::config::WorkerConfig;
use conduit_core::session::NO_CONTENT;
use conduit_core::{ConduitError, ProcessSupervisor, RpcChannel, SessionManager, WorkerState};
use serde_json::json;
use tempfile::TempDir;

fn manager(config: WorkerConfig) -> SessionManager {
    let channel = RpcChannel::new(ProcessSupervisor::new(config, 32), Duration::from_secs(5));
    SessionManager::new(channel)
}

/// Always asks for another tool call
const LOOPING_WORKER: &str = r#"
while IFS= read -r line; do
  method=$(printf '%s' "$line" | sed -n 's/.*"method":"\([^"]*\)".*/\1/p')
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  case "$method" in
    createSession) printf '{"jsonrpc":"2.0","result":{"sessionId":"loop"},"id":%s}\n' "$id" ;;
    addMessage) printf '{"jsonrpc":"2.0","result":{"messageId":"m1"},"id":%s}\n' "$id" ;;
    getCompletion) printf '{"jsonrpc":"2.0","result":{"completion":{"toolCall":{"name":"get_forecast","arguments":{"city":"Taipei"}}}},"id":%s}\n' "$id" ;;
    callTool)
      printf '{"jsonrpc":"2.0","result":{"content":[{"type":"text","text":"again"}],"isError":false},"id":%s}\n' "$id"
      ;;
  esac
done
"#;

#[tokio::test]
async fn test_weather_scenario_runs_tool_then_answers() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(script_worker(&dir, "weather.sh", WEATHER_WORKER));

    let session_id = manager.create_session().await.unwrap();
    assert_eq!(session_id, "abc");
    assert_eq!(manager.session().unwrap().id, "abc");

    let message_id = manager.add_message("weather in Taipei").await.unwrap();
    assert_eq!(message_id, "m1");

    // The worker only answers calls carrying session "abc" and only flips to
    // content once callTool carried messageId "m1".
    let outcome = manager.get_completion(&message_id).await.unwrap();
    assert_eq!(outcome.content, "Taipei: 25C, clear sky");
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(outcome.tool_calls[0].call.name, "get_weather_by_city");
    assert_eq!(outcome.tool_calls[0].call.arguments, json!({"city": "Taipei"}));

    manager.close().await;
    assert_eq!(manager.channel().state(), WorkerState::Stopped);
}

#[tokio::test]
async fn test_query_stops_worker() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(script_worker(&dir, "weather.sh", WEATHER_WORKER));

    let outcome = manager.query("weather in Taipei").await.unwrap();
    assert_eq!(outcome.content, "Taipei: 25C, clear sky");
    assert_eq!(manager.channel().state(), WorkerState::Stopped);
    assert!(manager.session().is_none());
}

#[tokio::test]
async fn test_direct_call_bypasses_completion() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(script_worker(&dir, "weather.sh", WEATHER_WORKER));

    let result = manager
        .direct_call("get_weather_by_city", json!({"city": "Taipei"}))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert_eq!(result.text(), "Taipei: 25C, clear sky");
    assert_eq!(manager.channel().state(), WorkerState::Stopped);

    // Only createSession and callTool reached the worker
    let diagnostics = manager.channel().diagnostics();
    assert!(!diagnostics.iter().any(|l| l.contains("getCompletion")));
}

#[tokio::test]
async fn test_describe_tools() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(script_worker(&dir, "weather.sh", WEATHER_WORKER));

    let tools = manager.describe_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "get_weather_by_city");
    assert!(tools[0].parameters[0].required);
    assert_eq!(manager.channel().state(), WorkerState::Stopped);
}

#[tokio::test]
async fn test_always_tool_call_hits_loop_limit() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(script_worker(&dir, "loop.sh", LOOPING_WORKER)).with_max_tool_rounds(3);

    let message_id = manager.add_message("forecast for Taipei").await.unwrap();
    let err = manager.get_completion(&message_id).await.unwrap_err();

    assert!(matches!(err, ConduitError::LoopLimit { rounds: 3, .. }), "got {err:?}");
    // createSession, addMessage, then four completions around three tool calls
    assert_eq!(manager.channel().next_id(), 10);
    assert_ne!(manager.channel().state(), WorkerState::Running);
}

#[tokio::test]
async fn test_missing_session_id_is_session_error() {
    let dir = TempDir::new().unwrap();
    let body = r#"
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  printf '{"jsonrpc":"2.0","result":{"session":"nope"},"id":%s}\n' "$id"
done
"#;
    let mut manager = manager(script_worker(&dir, "nosession.sh", body));

    let err = manager.query("weather in Taipei").await.unwrap_err();
    assert!(matches!(err, ConduitError::Session { .. }), "got {err:?}");
    assert_eq!(manager.channel().state(), WorkerState::Stopped);
}

#[tokio::test]
async fn test_missing_message_id_is_session_error() {
    let dir = TempDir::new().unwrap();
    let body = r#"
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  case "$line" in
    *createSession*) printf '{"jsonrpc":"2.0","result":{"sessionId":"abc"},"id":%s}\n' "$id" ;;
    *) printf '{"jsonrpc":"2.0","result":{},"id":%s}\n' "$id" ;;
  esac
done
"#;
    let mut manager = manager(script_worker(&dir, "nomessage.sh", body));

    let err = manager.add_message("hi").await.unwrap_err();
    assert!(err.to_string().contains("messageId"), "got {err}");
}

#[tokio::test]
async fn test_empty_completion_is_placeholder() {
    let dir = TempDir::new().unwrap();
    let body = r#"
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  case "$line" in
    *createSession*) printf '{"jsonrpc":"2.0","result":{"sessionId":"abc"},"id":%s}\n' "$id" ;;
    *addMessage*) printf '{"jsonrpc":"2.0","result":{"messageId":"m1"},"id":%s}\n' "$id" ;;
    *) printf '{"jsonrpc":"2.0","result":{"completion":{}},"id":%s}\n' "$id" ;;
  esac
done
"#;
    let mut manager = manager(script_worker(&dir, "empty.sh", body));

    let outcome = manager.query("anything").await.unwrap();
    assert_eq!(outcome.content, NO_CONTENT);
    assert!(outcome.tool_calls.is_empty());
}

#[tokio::test]
async fn test_query_timeout_tears_down() {
    let dir = TempDir::new().unwrap();
    let channel = RpcChannel::new(
        ProcessSupervisor::new(script_worker(&dir, "silent.sh", SILENT_WORKER), 32),
        Duration::from_millis(200),
    );
    let mut manager = SessionManager::new(channel);

    let err = manager.query("weather in Taipei").await.unwrap_err();
    assert!(matches!(err, ConduitError::Timeout { .. }), "got {err:?}");
    assert!(manager.channel().pid().is_none());
}

#[tokio::test]
async fn test_session_reused_across_calls() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(script_worker(&dir, "weather.sh", WEATHER_WORKER));

    let first = manager.create_session().await.unwrap();
    let created_at = manager.session().unwrap().created_at;
    manager.call_tool("get_weather_by_city", json!({"city": "Taipei"})).await.unwrap();
    let second = manager.create_session().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(manager.session().unwrap().created_at, created_at);
    // createSession (1) and callTool (2) only
    assert_eq!(manager.channel().next_id(), 3);
    manager.close().await;
}

#[tokio::test]
async fn test_restart_opens_new_session_on_new_worker() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(script_worker(&dir, "weather.sh", WEATHER_WORKER));

    manager.create_session().await.unwrap();
    let first_pid = manager.channel().pid().unwrap();

    manager.restart().await.unwrap();
    assert!(manager.session().is_none());
    assert_ne!(manager.channel().pid(), Some(first_pid));

    let result = manager
        .call_tool("get_weather_by_city", json!({"city": "Taipei"}))
        .await
        .unwrap();
    assert!(!result.is_error);
    // the fresh worker saw createSession (1) then callTool (2)
    assert_eq!(manager.channel().next_id(), 3);
    manager.close().await;
    assert!(manager.session().is_none());
}
