//! Shared helpers: throwaway `sh` workers written into a temp dir

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use conduit_core::config::WorkerConfig;
use tempfile::TempDir;

/// Reads requests and never answers
pub const SILENT_WORKER: &str = r#"
while IFS= read -r line; do
  :
done
"#;

/// Answers the session protocol for session "abc", rejecting any other id
pub const WEATHER_WORKER: &str = r#"
tool_done=0
while IFS= read -r line; do
  [ -z "$line" ] && continue
  method=$(printf '%s' "$line" | sed -n 's/.*"method":"\([^"]*\)".*/\1/p')
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  echo "worker got $method" >&2
  if [ "$method" != "createSession" ] && [ "$method" != "listTools" ]; then
    case "$line" in
      *'"sessionId":"abc"'*) ;;
      *)
        printf '{"jsonrpc":"2.0","error":{"code":-32001,"message":"Unknown session"},"id":%s}\n' "$id"
        continue
        ;;
    esac
  fi
  case "$method" in
    createSession)
      printf '{"jsonrpc":"2.0","result":{"sessionId":"abc"},"id":%s}\n' "$id"
      ;;
    addMessage)
      printf '{"jsonrpc":"2.0","result":{"messageId":"m1"},"id":%s}\n' "$id"
      ;;
    getCompletion)
      if [ "$tool_done" = "1" ]; then
        printf '{"jsonrpc":"2.0","result":{"completion":{"content":"Taipei: 25C, clear sky"}},"id":%s}\n' "$id"
      else
        printf '{"jsonrpc":"2.0","result":{"completion":{"toolCall":{"name":"get_weather_by_city","arguments":{"city":"Taipei"}}}},"id":%s}\n' "$id"
      fi
      ;;
    callTool)
      case "$line" in
        *'"messageId":"m1"'*) tool_done=1 ;;
      esac
      printf '{"jsonrpc":"2.0","result":{"content":[{"type":"text","text":"Taipei: 25C, clear sky"}],"isError":false},"id":%s}\n' "$id"
      ;;
    listTools)
      printf '{"jsonrpc":"2.0","result":{"tools":[{"name":"get_weather_by_city","description":"Current weather","parameters":[{"name":"city","type":"string","description":"City name","required":true}]}]},"id":%s}\n' "$id"
      ;;
    *)
      printf '{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":%s}\n' "$id"
      ;;
  esac
done
"#;

/// Writes `body` as a script and returns a config running it with `sh`
pub fn script_worker(dir: &TempDir, name: &str, body: &str) -> WorkerConfig {
    let path = dir.path().join(name);
    write_script(&path, body);
    WorkerConfig::command("sh", vec![path.to_string_lossy().to_string()])
        .with_startup_grace(Duration::from_millis(150))
        .with_shutdown_grace(Duration::from_millis(300))
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{}", body)).expect("write mock script");
}

/// Whether a process with this pid still exists
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    !matches!(
        kill(Pid::from_raw(pid as i32), None),
        Err(nix::errno::Errno::ESRCH)
    )
}
