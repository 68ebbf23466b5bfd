//! Worker stdio protocol server
//!
//! Reads one JSON-RPC request per line and writes exactly one response line
//! per request. Nothing but responses ever goes to the writer; logs belong
//! on stderr.

mod session;

pub use session::{SessionStore, StoredMessage, WorkerSession};

use conduit_core::protocol::{
    AddMessageParams, AddMessageResult, CallToolParams, CompletionResult, CreateSessionResult,
    GetCompletionParams, ListToolsResult, RpcError, RpcResponse, methods,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::planner::Planner;
use crate::registry::ToolRegistry;

/// Serves tool calls and completions over a line-oriented stream
pub struct WorkerServer {
    registry: ToolRegistry,
    planner: Box<dyn Planner>,
    sessions: SessionStore,
}

impl WorkerServer {
    pub fn new(registry: ToolRegistry, planner: Box<dyn Planner>) -> Self {
        Self {
            registry,
            planner,
            sessions: SessionStore::new(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Serve until the reader reaches end of stream
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(response) = self.handle_line(&line).await {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        info!("Input closed, worker exiting");
        Ok(())
    }

    /// Handle one input line; `None` for blank lines and notifications
    pub async fn handle_line(&mut self, line: &str) -> Option<RpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparsable request line: {}", e);
                return Some(RpcResponse::error(None, RpcError::parse_error()));
            }
        };

        let id = match request.get("id") {
            None => None,
            Some(raw) => match raw.as_u64() {
                Some(id) => Some(id),
                None => {
                    return Some(RpcResponse::error(None, RpcError::invalid_request()));
                }
            },
        };

        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return Some(RpcResponse::error(id, RpcError::invalid_request()));
        };
        let params = request.get("params").cloned().unwrap_or(Value::Null);

        debug!(?id, method, "Request");
        let outcome = self.dispatch(method, params).await;

        let Some(id) = id else {
            debug!(method, "Notification handled without reply");
            return None;
        };
        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => {
                debug!(id, method, code = error.code, "Request rejected: {}", error.message);
                RpcResponse::error(Some(id), error)
            }
        })
    }

    async fn dispatch(&mut self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            methods::CREATE_SESSION => {
                let session_id = self.sessions.create().id.clone();
                info!(session_id = %session_id, "Session created");
                to_value(CreateSessionResult { session_id })
            }
            methods::ADD_MESSAGE => {
                let params: AddMessageParams = parse_params(params)?;
                let session = self
                    .sessions
                    .get_mut(&params.session_id)
                    .ok_or_else(|| unknown_session(&params.session_id))?;
                let message = session.add_message(params.message.role, params.message.content);
                to_value(AddMessageResult {
                    message_id: message.id.clone(),
                })
            }
            methods::GET_COMPLETION => {
                let params: GetCompletionParams = parse_params(params)?;
                let session = self
                    .sessions
                    .get(&params.session_id)
                    .ok_or_else(|| unknown_session(&params.session_id))?;
                let message = session
                    .message(&params.message_id)
                    .ok_or_else(|| unknown_message(&params.message_id))?;
                let completion = self.planner.plan(&message.content, &message.tool_results);
                to_value(CompletionResult { completion })
            }
            methods::CALL_TOOL => {
                let params: CallToolParams = parse_params(params)?;
                {
                    let session = self
                        .sessions
                        .get(&params.session_id)
                        .ok_or_else(|| unknown_session(&params.session_id))?;
                    if let Some(message_id) = &params.message_id {
                        session
                            .message(message_id)
                            .ok_or_else(|| unknown_message(message_id))?;
                    }
                }

                let result = self.registry.dispatch(&params.name, &params.arguments).await;
                info!(tool = %params.name, is_error = result.is_error, "Tool executed");

                if let Some(message) = params.message_id.as_deref().and_then(|message_id| {
                    self.sessions
                        .get_mut(&params.session_id)
                        .and_then(|s| s.message_mut(message_id))
                }) {
                    message.tool_results.push(result.clone());
                }
                to_value(result)
            }
            methods::LIST_TOOLS => to_value(ListToolsResult {
                tools: self.registry.descriptors(),
            }),
            other => Err(RpcError::method_not_found(other)),
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(RpcError::invalid_params)
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::new(-32603, format!("Internal error: {}", e)))
}

fn unknown_session(id: &str) -> RpcError {
    RpcError::unknown_reference(format!("Unknown session: {}", id))
}

fn unknown_message(id: &str) -> RpcError {
    RpcError::unknown_reference(format!("Unknown message: {}", id))
}
