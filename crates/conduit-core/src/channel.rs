//! Request/response channel over the worker's pipes
//!
//! One request is in flight at a time: [`RpcChannel::send`] takes `&mut self`
//! and only returns once the matching response, a timeout, or a failure has
//! been observed. Any protocol violation leaves the channel failed until
//! [`RpcChannel::restart`] is called.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::ConduitConfig;
use crate::error::{ConduitError, ConduitResult, PARSE_ERROR_RPC_CODE};
use crate::process::{ProcessSupervisor, WorkerState};
use crate::protocol::{RpcRequest, RpcResponse};

/// How many trailing stderr lines are attached to an end-of-stream error
const EOF_DIAGNOSTIC_LINES: usize = 5;

/// The request currently awaiting its response
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: u64,
    pub method: String,
    pub deadline: Instant,
}

/// Line-delimited JSON-RPC channel bound to one supervised worker
pub struct RpcChannel {
    supervisor: ProcessSupervisor,
    request_timeout: Duration,
    next_id: u64,
    pending: Option<PendingRequest>,
    failure: Option<String>,
}

impl RpcChannel {
    pub fn new(supervisor: ProcessSupervisor, request_timeout: Duration) -> Self {
        Self {
            supervisor,
            request_timeout,
            next_id: 1,
            pending: None,
            failure: None,
        }
    }

    /// Build a channel and its supervisor from the loaded configuration
    pub fn from_config(config: &ConduitConfig) -> Self {
        let supervisor = ProcessSupervisor::new(
            config.worker.clone(),
            config.diagnostics.stderr_buffer_lines,
        );
        Self::new(supervisor, config.rpc.request_timeout())
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    pub fn state(&self) -> WorkerState {
        self.supervisor.state()
    }

    pub fn pid(&self) -> Option<u32> {
        self.supervisor.pid()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.supervisor.diagnostics()
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Whether an earlier failure makes the channel refuse requests
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Request in flight, if any
    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Id the next request will carry
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Send one request and wait for its validated response
    ///
    /// The returned response always carries a `result`. Error responses,
    /// malformed lines and mismatched ids are turned into
    /// [`ConduitError::Protocol`] and tear the worker down.
    #[instrument(level = "debug", skip(self, params))]
    pub async fn send(&mut self, method: &str, params: Value) -> ConduitResult<RpcResponse> {
        if let Some(reason) = &self.failure {
            return Err(ConduitError::channel_failed(reason.clone())
                .with_context(format!("Refusing to send '{}'", method)));
        }

        if matches!(
            self.supervisor.state(),
            WorkerState::NotStarted | WorkerState::Stopped
        ) {
            self.start_worker().await?;
        } else if !self.supervisor.is_running() {
            let err = ConduitError::channel_failed("Worker is not running")
                .with_context(format!("Sending '{}'", method));
            self.failure = Some(err.to_string());
            return Err(err);
        }

        let id = self.next_id;
        self.next_id += 1;

        let line = RpcRequest::new(id, method, params).to_line()?;
        let deadline = Instant::now() + self.request_timeout;
        self.pending = Some(PendingRequest {
            id,
            method: method.to_string(),
            deadline,
        });

        debug!(id, "Sending request");
        let outcome = tokio::time::timeout_at(deadline, self.exchange(&line)).await;
        self.pending = None;

        match outcome {
            Err(_) => {
                let timeout_ms = self.request_timeout.as_millis() as u64;
                warn!(id, timeout_ms, "Request timed out, killing worker");
                self.supervisor.kill().await;
                let err = ConduitError::timeout(method, timeout_ms);
                self.failure = Some(err.to_string());
                Err(err)
            }
            Ok(Err(err)) => Err(self.collapse(err).await),
            Ok(Ok(reply)) => match self.validate(id, method, reply) {
                Ok(response) => {
                    debug!(id, "Received response");
                    Ok(response)
                }
                Err(err) => Err(self.collapse(err).await),
            },
        }
    }

    /// Send a request and decode its result into `T`
    ///
    /// A result that does not match `T` is a protocol error naming the method.
    pub async fn call<T: DeserializeOwned>(&mut self, method: &str, params: Value) -> ConduitResult<T> {
        let response = self.send(method, params).await?;
        let result = response.result.unwrap_or(Value::Null);

        match serde_json::from_value(result) {
            Ok(value) => Ok(value),
            Err(e) => {
                let err = ConduitError::protocol(format!(
                    "Unexpected result for '{}': {}",
                    method, e
                ));
                Err(self.collapse(err).await)
            }
        }
    }

    /// Clear any failure and start a fresh worker
    #[instrument(level = "debug", skip(self))]
    pub async fn restart(&mut self) -> ConduitResult<()> {
        self.failure = None;
        self.pending = None;
        self.start_worker().await
    }

    /// Stop the worker; the channel restarts it on the next send
    pub async fn shutdown(&mut self) {
        self.pending = None;
        self.supervisor.stop().await;
    }

    async fn start_worker(&mut self) -> ConduitResult<()> {
        self.next_id = 1;
        if let Err(err) = self.supervisor.start().await {
            self.failure = Some(err.to_string());
            return Err(err);
        }
        Ok(())
    }

    async fn exchange(&mut self, line: &str) -> ConduitResult<Option<String>> {
        self.supervisor.write_line(line).await?;
        self.supervisor.read_line().await
    }

    fn validate(&self, id: u64, method: &str, reply: Option<String>) -> ConduitResult<RpcResponse> {
        let Some(line) = reply else {
            let mut err = ConduitError::protocol(format!(
                "Worker closed its output before answering '{}'",
                method
            ));
            let diagnostics = self.supervisor.diagnostics();
            if !diagnostics.is_empty() {
                let tail = diagnostics.len().saturating_sub(EOF_DIAGNOSTIC_LINES);
                err = err.with_context(diagnostics[tail..].join("\n"));
            }
            return Err(err);
        };

        if line.trim().is_empty() {
            return Err(ConduitError::protocol(format!(
                "Empty response line for '{}'",
                method
            )));
        }

        let response: RpcResponse = serde_json::from_str(&line).map_err(|e| {
            ConduitError::protocol_with_code(
                PARSE_ERROR_RPC_CODE,
                format!("Malformed response for '{}': {}", method, e),
            )
        })?;

        if let Some(error) = &response.error {
            return Err(ConduitError::protocol_with_code(
                error.code,
                format!("Worker rejected '{}': {}", method, error.message),
            ));
        }

        if response.id != Some(id) {
            return Err(ConduitError::protocol(format!(
                "Response id {:?} does not match request {} ('{}')",
                response.id, id, method
            )));
        }

        if response.result.is_none() {
            return Err(ConduitError::protocol(format!(
                "Response for '{}' has neither result nor error",
                method
            )));
        }

        Ok(response)
    }

    /// Mark the channel failed and force the worker down
    async fn collapse(&mut self, err: ConduitError) -> ConduitError {
        if err.poisons_channel() {
            warn!(code = err.error_code(), "Channel failed: {}", err);
            self.failure = Some(err.to_string());
            self.supervisor.kill().await;
        }
        err
    }
}
