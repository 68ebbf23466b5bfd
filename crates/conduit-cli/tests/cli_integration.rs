//! End-to-end tests against the built `conduit` and `conduit-worker` binaries

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

const CONDUIT: &str = env!("CARGO_BIN_EXE_conduit");
const WORKER: &str = env!("CARGO_BIN_EXE_conduit-worker");

/// Controller command isolated from the caller's environment and config
fn conduit(dir: &Path) -> Command {
    let mut cmd = Command::new(CONDUIT);
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("CONDUIT_WORKER_COMMAND")
        .env_remove("CONDUIT_REQUEST_TIMEOUT_SECS")
        .env_remove("CONDUIT_MAX_TOOL_ROUNDS")
        .env_remove("CONDUIT_LOG_LEVEL")
        .env("OPENWEATHERMAP_API_KEY", "")
        .env("CONDUIT_WEATHER_API_BASE", "http://127.0.0.1:9");
    cmd
}

fn run(cmd: &mut Command) -> (Output, String, String) {
    let output = cmd.output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output, stdout, stderr)
}

#[test]
fn test_missing_query_prints_usage() {
    let dir = TempDir::new().unwrap();
    let (output, stdout, stderr) = run(&mut conduit(dir.path()));

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.is_empty());
    assert!(stderr.contains("Usage"), "{stderr}");
}

#[test]
fn test_query_through_completion_loop() {
    let dir = TempDir::new().unwrap();
    let (output, stdout, stderr) = run(conduit(dir.path())
        .arg("--worker")
        .arg(WORKER)
        .arg("weather in Taipei"));

    assert!(output.status.success(), "{stderr}");
    assert!(stdout.contains("Weather data unavailable"), "{stdout}");
}

#[test]
fn test_worker_found_next_to_controller() {
    let dir = TempDir::new().unwrap();
    let (output, stdout, stderr) = run(conduit(dir.path()).arg("-c").arg("Taipei"));

    assert!(output.status.success(), "{stderr}");
    assert!(stdout.contains("Weather data unavailable"), "{stdout}");
}

#[test]
fn test_direct_out_of_range_is_content() {
    let dir = TempDir::new().unwrap();
    let (output, stdout, stderr) = run(conduit(dir.path())
        .args(["--worker", WORKER, "-d", "--tool", "get_forecast"])
        .args(["--args", r#"{"city":"Taipei","days":6}"#]));

    assert!(output.status.success(), "{stderr}");
    assert!(stdout.contains("Forecast days must be between 1 and 5"), "{stdout}");
}

#[test]
fn test_tools_subcommand() {
    let dir = TempDir::new().unwrap();
    let (output, stdout, stderr) = run(conduit(dir.path()).args(["--worker", WORKER, "tools"]));

    assert!(output.status.success(), "{stderr}");
    for name in ["get_weather_by_city", "get_weather_by_coordinates", "get_forecast"] {
        assert!(stdout.contains(name), "missing {name} in {stdout}");
    }
}

#[test]
fn test_missing_worker_fails_with_diagnostic() {
    let dir = TempDir::new().unwrap();
    let (output, _stdout, stderr) = run(conduit(dir.path())
        .args(["--worker", "/nonexistent/conduit-worker", "hello"]));

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("error:"), "{stderr}");
    assert!(stderr.contains("Worker failed to start"), "{stderr}");
}

#[test]
fn test_crashing_worker_reports_its_stderr() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("crash.sh");
    std::fs::write(&script, "echo 'missing API module' >&2\nexit 3\n").unwrap();

    let (output, _stdout, stderr) = run(conduit(dir.path())
        .arg("--worker")
        .arg(format!("sh {}", script.display()))
        .arg("weather in Taipei"));

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("missing API module"), "{stderr}");
}

#[test]
fn test_config_init_validate_show() {
    let dir = TempDir::new().unwrap();

    let (output, _, stderr) = run(conduit(dir.path()).args(["config", "init"]));
    assert!(output.status.success(), "{stderr}");
    assert!(dir.path().join("conduit.toml").exists());

    let (output, _, stderr) = run(conduit(dir.path()).args(["config", "validate"]));
    assert!(output.status.success(), "{stderr}");

    let (output, stdout, _) = run(conduit(dir.path())
        .env("CONDUIT_MAX_TOOL_ROUNDS", "3")
        .args(["config", "show"]));
    assert!(output.status.success());
    assert!(stdout.contains("max_tool_rounds = 3"), "{stdout}");

    let (output, _, stderr) = run(conduit(dir.path()).args(["config", "init"]));
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("already exists"), "{stderr}");
}

#[test]
fn test_worker_speaks_protocol_on_stdout_only() {
    let dir = TempDir::new().unwrap();
    let mut child = Command::new(WORKER)
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env("OPENWEATHERMAP_API_KEY", "")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, r#"{{"jsonrpc":"2.0","method":"createSession","params":{{}},"id":1}}"#).unwrap();
        writeln!(stdin, "{{not json").unwrap();
        writeln!(stdin, r#"{{"jsonrpc":"2.0","method":"listTools","params":{{}},"id":2}}"#).unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let replies: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["id"], 1);
    assert!(replies[0]["result"]["sessionId"].is_string());
    assert_eq!(replies[1]["id"], Value::Null);
    assert_eq!(replies[1]["error"]["code"], -32700);
    assert_eq!(replies[2]["result"]["tools"].as_array().unwrap().len(), 3);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No weather API key configured"), "{stderr}");
}
