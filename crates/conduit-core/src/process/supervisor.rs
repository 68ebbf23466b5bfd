//! Worker process lifecycle
//!
//! The supervisor is the only owner of the child handle and its pipes.
//! Everything above it talks to the worker through [`ProcessSupervisor::write_line`]
//! and [`ProcessSupervisor::read_line`].

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use super::drain::{DiagnosticSink, StderrDrain};
use crate::config::WorkerConfig;
use crate::error::{ConduitError, ConduitResult, PARSE_ERROR_RPC_CODE};

/// How long a dead worker's remaining stderr may take to arrive
const EXIT_DRAIN_LIMIT: Duration = Duration::from_millis(250);

/// Lifecycle state of the worker process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Never started
    NotStarted,
    /// Spawned and past the startup grace window
    Running,
    /// Stopped on request
    Stopped,
    /// Failed to start, or killed after a timeout
    Failed,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "NOT_STARTED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

struct WorkerProcess {
    child: Child,
    pid: Option<u32>,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    drain: Option<StderrDrain>,
}

/// Spawns, watches and tears down one worker at a time
pub struct ProcessSupervisor {
    config: WorkerConfig,
    sink: DiagnosticSink,
    process: Option<WorkerProcess>,
    state: WorkerState,
    line_buffer: Vec<u8>,
}

impl ProcessSupervisor {
    pub fn new(config: WorkerConfig, stderr_buffer_lines: usize) -> Self {
        Self {
            config,
            sink: DiagnosticSink::new(stderr_buffer_lines),
            process: None,
            state: WorkerState::NotStarted,
            line_buffer: Vec::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == WorkerState::Running && self.process.is_some()
    }

    /// OS process id of the current worker
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid)
    }

    /// Snapshot of the captured worker stderr
    pub fn diagnostics(&self) -> Vec<String> {
        self.sink.snapshot()
    }

    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    /// Spawn a fresh worker, replacing any current one
    ///
    /// The worker must survive the startup grace window; an early exit is
    /// reported together with whatever it wrote to stderr.
    pub async fn start(&mut self) -> ConduitResult<()> {
        self.stop().await;
        self.sink.clear();

        let command_line = self.config.display_command();
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.config.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.state = WorkerState::Failed;
                return Err(ConduitError::startup(
                    format!("Failed to spawn worker '{}': {}", command_line, e),
                    Vec::new(),
                ));
            }
        };

        let pid = child.id();
        let (stdin, stdout, stderr) =
            match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
                (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
                _ => {
                    let _ = child.kill().await;
                    self.state = WorkerState::Failed;
                    return Err(ConduitError::startup(
                        "Failed to capture worker pipes",
                        Vec::new(),
                    ));
                }
            };

        let drain = StderrDrain::spawn(stderr, self.sink.clone(), pid);
        let grace = self.config.startup_grace();

        match tokio::time::timeout(grace, child.wait()).await {
            Err(_) => {
                info!(?pid, command = %command_line, "Worker started");
                self.process = Some(WorkerProcess {
                    child,
                    pid,
                    stdin: Some(stdin),
                    stdout: BufReader::new(stdout),
                    drain: Some(drain),
                });
                self.state = WorkerState::Running;
                Ok(())
            }
            Ok(Ok(status)) => {
                drop(stdin);
                drain.finish(EXIT_DRAIN_LIMIT).await;
                self.state = WorkerState::Failed;
                warn!(?pid, %status, "Worker exited during startup");
                Err(ConduitError::startup(
                    format!("Worker '{}' exited during startup", command_line),
                    self.sink.snapshot(),
                )
                .with_exit_status(status.to_string()))
            }
            Ok(Err(e)) => {
                drop(stdin);
                let _ = child.kill().await;
                drain.stop().await;
                self.state = WorkerState::Failed;
                Err(ConduitError::startup(
                    format!("Failed to watch worker '{}': {}", command_line, e),
                    self.sink.snapshot(),
                ))
            }
        }
    }

    /// Gracefully stop the worker; a no-op when none is held
    pub async fn stop(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };

        // Closing stdin is the first hint to exit
        process.stdin.take();
        request_termination(&mut process.child, process.pid);

        match tokio::time::timeout(self.config.shutdown_grace(), process.child.wait()).await {
            Ok(Ok(status)) => debug!(pid = ?process.pid, %status, "Worker exited"),
            Ok(Err(e)) => warn!(pid = ?process.pid, "Failed to wait for worker: {}", e),
            Err(_) => {
                warn!(pid = ?process.pid, "Worker ignored termination, killing");
                if let Err(e) = process.child.kill().await {
                    warn!(pid = ?process.pid, "Failed to kill worker: {}", e);
                }
            }
        }

        if let Some(drain) = process.drain.take() {
            drain.finish(EXIT_DRAIN_LIMIT).await;
        }
        self.state = WorkerState::Stopped;
    }

    /// Hard-kill the worker and mark it failed
    pub async fn kill(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.stdin.take();
            if let Err(e) = process.child.kill().await {
                warn!(pid = ?process.pid, "Failed to kill worker: {}", e);
            }
            if let Some(drain) = process.drain.take() {
                drain.finish(EXIT_DRAIN_LIMIT).await;
            }
            info!(pid = ?process.pid, "Worker killed");
        }
        self.state = WorkerState::Failed;
    }

    /// Write one protocol line, appending the newline
    pub async fn write_line(&mut self, line: &str) -> ConduitResult<()> {
        let stdin = self
            .process
            .as_mut()
            .and_then(|p| p.stdin.as_mut())
            .ok_or_else(|| ConduitError::io("Worker is not running"))?;

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        stdin
            .write_all(&buf)
            .await
            .map_err(|e| ConduitError::io(e.to_string()).with_context("Writing to worker stdin"))?;
        stdin
            .flush()
            .await
            .map_err(|e| ConduitError::io(e.to_string()).with_context("Flushing worker stdin"))?;
        Ok(())
    }

    /// Read one protocol line without its terminator; `None` at end of stream
    ///
    /// A line that is not UTF-8 is a protocol error, not an I/O failure.
    pub async fn read_line(&mut self) -> ConduitResult<Option<String>> {
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| ConduitError::io("Worker is not running"))?;

        self.line_buffer.clear();
        let bytes_read = process
            .stdout
            .read_until(b'\n', &mut self.line_buffer)
            .await
            .map_err(|e| ConduitError::io(e.to_string()).with_context("Reading worker stdout"))?;

        if bytes_read == 0 {
            return Ok(None);
        }
        let line = std::str::from_utf8(&self.line_buffer).map_err(|e| {
            ConduitError::protocol_with_code(
                PARSE_ERROR_RPC_CODE,
                format!("Worker output is not valid UTF-8: {}", e),
            )
        })?;
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child, pid: Option<u32>) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => debug!(pid, "Sent SIGTERM to worker"),
        Err(nix::errno::Errno::ESRCH) => debug!(pid, "Worker already gone"),
        Err(e) => {
            warn!(pid, "SIGTERM failed ({}), killing instead", e);
            let _ = child.start_kill();
        }
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child, _pid: Option<u32>) {
    let _ = child.start_kill();
}
