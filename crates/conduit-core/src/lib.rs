//! Conduit core: supervise a tool worker and talk JSON-RPC to it over its pipes
//!
//! Layers, leaves first:
//! - [`process`]: spawning, stderr draining and teardown of the worker
//! - [`channel`]: one-at-a-time request/response correlation with deadlines
//! - [`session`]: session ids and the bounded completion/tool loop
//!
//! [`protocol`] holds the wire types shared with the worker side.

pub mod channel;
pub mod config;
pub mod error;
pub mod process;
pub mod protocol;
pub mod session;

pub use channel::{PendingRequest, RpcChannel};
pub use config::{ConduitConfig, WorkerConfig};
pub use error::{ConduitError, ConduitResult};
pub use process::{DiagnosticSink, ProcessSupervisor, StderrDrain, WorkerState};
pub use protocol::{
    Completion, Content, RpcError, RpcRequest, RpcResponse, ToolCall, ToolCallResult,
    ToolDescriptor, ToolParameter,
};
pub use session::{CompletionOutcome, ExecutedToolCall, Session, SessionManager};
