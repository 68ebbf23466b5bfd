//! Bounded completion/tool loop

use serde::Serialize;

use crate::error::{ConduitError, ConduitResult};
use crate::protocol::{Completion, ToolCall, ToolCallResult};

/// Text returned when a completion carries neither content nor a tool call
pub const NO_CONTENT: &str = "No content";

/// Where the completion loop currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    AwaitingCompletion,
    ExecutingTool(ToolCall),
    Done(String),
    Failed,
}

/// A tool call the loop executed on the worker's request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutedToolCall {
    pub call: ToolCall,
    pub result: ToolCallResult,
}

/// Final answer plus the tool calls that led to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionOutcome {
    pub content: String,
    pub tool_calls: Vec<ExecutedToolCall>,
}

/// Pure transition logic; the session manager drives the I/O
#[derive(Debug)]
pub struct CompletionLoop {
    max_tool_rounds: u32,
    rounds: u32,
    state: LoopState,
    transcript: Vec<ExecutedToolCall>,
}

impl CompletionLoop {
    pub fn new(max_tool_rounds: u32) -> Self {
        Self {
            max_tool_rounds,
            rounds: 0,
            state: LoopState::AwaitingCompletion,
            transcript: Vec::new(),
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Tool calls executed so far
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Feed a completion received while awaiting one
    ///
    /// A pending tool call wins over content. Asking for one tool call more
    /// than the budget allows fails the loop.
    pub fn on_completion(&mut self, completion: Completion) -> ConduitResult<&LoopState> {
        if self.state != LoopState::AwaitingCompletion {
            return Err(self.fail(ConduitError::session(
                "Completion received while not awaiting one",
            )));
        }

        self.state = match completion {
            Completion {
                tool_call: Some(call),
                ..
            } => {
                if self.rounds >= self.max_tool_rounds {
                    return Err(self.fail(ConduitError::loop_limit(self.max_tool_rounds)));
                }
                LoopState::ExecutingTool(call)
            }
            Completion {
                content: Some(content),
                ..
            } => LoopState::Done(content),
            _ => LoopState::Done(NO_CONTENT.to_string()),
        };
        Ok(&self.state)
    }

    /// Record the result of the tool call being executed
    pub fn on_tool_result(&mut self, result: ToolCallResult) -> ConduitResult<()> {
        let LoopState::ExecutingTool(call) =
            std::mem::replace(&mut self.state, LoopState::AwaitingCompletion)
        else {
            return Err(self.fail(ConduitError::session(
                "Tool result received while no tool was executing",
            )));
        };

        self.rounds += 1;
        self.transcript.push(ExecutedToolCall { call, result });
        Ok(())
    }

    /// Mark the loop failed, passing the error through
    pub fn fail(&mut self, err: ConduitError) -> ConduitError {
        self.state = LoopState::Failed;
        err
    }

    /// Consume a finished loop
    pub fn into_outcome(self) -> ConduitResult<CompletionOutcome> {
        match self.state {
            LoopState::Done(content) => Ok(CompletionOutcome {
                content,
                tool_calls: self.transcript,
            }),
            other => Err(ConduitError::session(format!(
                "Completion loop ended in state {:?}",
                other
            ))),
        }
    }
}
