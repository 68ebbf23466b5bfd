//! Session bookkeeping and the completion loop
//!
//! [`SessionManager`] holds the worker-assigned session id and drives
//! `addMessage` / `getCompletion` / `callTool` over an [`RpcChannel`].
//! The scoped operations ([`SessionManager::query`],
//! [`SessionManager::direct_call`], [`SessionManager::describe_tools`])
//! stop the worker before returning, whatever the outcome.

mod completion;

pub use completion::{CompletionLoop, CompletionOutcome, ExecutedToolCall, LoopState, NO_CONTENT};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::channel::RpcChannel;
use crate::config::{ConduitConfig, defaults};
use crate::error::{ConduitError, ConduitResult};
use crate::protocol::{
    AddMessageParams, CallToolParams, CompletionResult, GetCompletionParams, ListToolsResult,
    MessageInput, Role, ToolCallResult, ToolDescriptor, methods,
};

/// Session opened on the current worker
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

// Lenient shapes so a missing id surfaces as a session error rather than
// a generic schema mismatch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionIdReply {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageIdReply {
    #[serde(default)]
    message_id: Option<String>,
}

/// Drives one conversation with the worker
pub struct SessionManager {
    channel: RpcChannel,
    session: Option<Session>,
    max_tool_rounds: u32,
}

impl SessionManager {
    pub fn new(channel: RpcChannel) -> Self {
        Self {
            channel,
            session: None,
            max_tool_rounds: defaults::session::MAX_TOOL_ROUNDS,
        }
    }

    pub fn from_config(config: &ConduitConfig) -> Self {
        Self::new(RpcChannel::from_config(config)).with_max_tool_rounds(config.session.max_tool_rounds)
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn max_tool_rounds(&self) -> u32 {
        self.max_tool_rounds
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn channel(&self) -> &RpcChannel {
        &self.channel
    }

    /// Open a session, or return the one already held
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&mut self) -> ConduitResult<String> {
        if let Some(session) = &self.session {
            return Ok(session.id.clone());
        }

        let reply: SessionIdReply = self.channel.call(methods::CREATE_SESSION, json!({})).await?;
        let Some(id) = reply.session_id.filter(|id| !id.is_empty()) else {
            let err = ConduitError::session("createSession returned no sessionId")
                .with_context(methods::CREATE_SESSION);
            return Err(self.abort(err).await);
        };

        info!(session_id = %id, "Session created");
        self.session = Some(Session {
            id: id.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    /// Post a user message and return the id the worker assigned to it
    #[instrument(level = "debug", skip(self, content))]
    pub async fn add_message(&mut self, content: &str) -> ConduitResult<String> {
        let session_id = self.create_session().await?;
        let params = AddMessageParams {
            session_id,
            message: MessageInput {
                role: Role::User,
                content: content.to_string(),
            },
        };

        let reply: MessageIdReply = self
            .channel
            .call(methods::ADD_MESSAGE, serde_json::to_value(params)?)
            .await?;
        match reply.message_id.filter(|id| !id.is_empty()) {
            Some(id) => Ok(id),
            None => {
                let err = ConduitError::session("addMessage returned no messageId")
                    .with_context(methods::ADD_MESSAGE);
                Err(self.abort(err).await)
            }
        }
    }

    /// Ask for the reply to a message, running requested tools in between
    #[instrument(level = "debug", skip(self))]
    pub async fn get_completion(&mut self, message_id: &str) -> ConduitResult<CompletionOutcome> {
        let session_id = self.create_session().await?;
        let mut lp = CompletionLoop::new(self.max_tool_rounds);

        loop {
            let params = GetCompletionParams {
                session_id: session_id.clone(),
                message_id: message_id.to_string(),
            };
            let reply: CompletionResult = match self
                .channel
                .call(methods::GET_COMPLETION, serde_json::to_value(params)?)
                .await
            {
                Ok(reply) => reply,
                Err(err) => return Err(lp.fail(err)),
            };

            let call = match lp.on_completion(reply.completion) {
                Ok(LoopState::ExecutingTool(call)) => call.clone(),
                Ok(_) => break,
                Err(err) => return Err(self.abort(err).await),
            };

            debug!(tool = %call.name, round = lp.rounds() + 1, "Executing requested tool");
            let result = match self
                .call_tool_in(&session_id, &call.name, call.arguments.clone(), Some(message_id))
                .await
            {
                Ok(result) => result,
                Err(err) => return Err(lp.fail(err)),
            };
            if let Err(err) = lp.on_tool_result(result) {
                return Err(self.abort(err).await);
            }
        }

        lp.into_outcome()
    }

    /// Invoke a tool directly within the current session
    #[instrument(level = "debug", skip(self, arguments))]
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> ConduitResult<ToolCallResult> {
        let session_id = self.create_session().await?;
        self.call_tool_in(&session_id, name, arguments, None).await
    }

    /// Describe the worker's tools
    #[instrument(level = "debug", skip(self))]
    pub async fn list_tools(&mut self) -> ConduitResult<Vec<ToolDescriptor>> {
        let reply: ListToolsResult = self.channel.call(methods::LIST_TOOLS, json!({})).await?;
        Ok(reply.tools)
    }

    /// Post `content` and wait for the final answer, then stop the worker
    pub async fn query(&mut self, content: &str) -> ConduitResult<CompletionOutcome> {
        let result = self.run_query(content).await;
        self.close().await;
        result
    }

    /// Call one tool without the completion loop, then stop the worker
    pub async fn direct_call(&mut self, name: &str, arguments: Value) -> ConduitResult<ToolCallResult> {
        let result = self.call_tool(name, arguments).await;
        self.close().await;
        result
    }

    /// List the worker's tools, then stop the worker
    pub async fn describe_tools(&mut self) -> ConduitResult<Vec<ToolDescriptor>> {
        let result = self.list_tools().await;
        self.close().await;
        result
    }

    /// Recover a failed channel with a fresh worker and no session
    pub async fn restart(&mut self) -> ConduitResult<()> {
        self.session = None;
        self.channel.restart().await
    }

    /// Stop the worker and forget the session bound to it
    pub async fn close(&mut self) {
        self.session = None;
        self.channel.shutdown().await;
    }

    /// Tear the worker down after a failure the channel did not see
    async fn abort(&mut self, err: ConduitError) -> ConduitError {
        info!(code = err.error_code(), "Aborting session: {}", err);
        self.close().await;
        err
    }

    async fn run_query(&mut self, content: &str) -> ConduitResult<CompletionOutcome> {
        let message_id = self.add_message(content).await?;
        self.get_completion(&message_id).await
    }

    async fn call_tool_in(
        &mut self,
        session_id: &str,
        name: &str,
        arguments: Value,
        message_id: Option<&str>,
    ) -> ConduitResult<ToolCallResult> {
        let params = CallToolParams {
            session_id: session_id.to_string(),
            name: name.to_string(),
            arguments,
            message_id: message_id.map(str::to_string),
        };
        self.channel
            .call(methods::CALL_TOOL, serde_json::to_value(params)?)
            .await
    }
}
