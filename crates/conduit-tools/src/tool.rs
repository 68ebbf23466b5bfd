//! Tool trait and argument helpers

use async_trait::async_trait;
use conduit_core::protocol::{Content, ToolDescriptor, ToolParameter};
use serde_json::Value;

/// Error type for tool execution
///
/// Never crosses the wire as a protocol error: the registry folds every
/// variant into a text result flagged `isError`.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Missing or ill-typed argument
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Argument present but outside its accepted range
    #[error("{0}")]
    OutOfRange(String),

    /// No tool registered under this name
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Tool execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments(_) => "TOOL_INVALID_ARGS",
            ToolError::OutOfRange(_) => "TOOL_OUT_OF_RANGE",
            ToolError::NotFound(_) => "TOOL_NOT_FOUND",
            ToolError::ExecutionFailed(_) => "TOOL_EXEC_FAILED",
        }
    }
}

/// A named operation the worker exposes
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used in `callTool`
    fn name(&self) -> &str;

    /// One-line description for `listTools`
    fn description(&self) -> &str;

    /// Typed parameter descriptors
    fn parameters(&self) -> Vec<ToolParameter>;

    /// Run the tool
    ///
    /// # Errors
    ///
    /// Returns `ToolError` for bad arguments or a failed execution. Upstream
    /// outages are expected to degrade to content instead.
    async fn execute(&self, arguments: &Value) -> Result<Vec<Content>, ToolError>;

    /// Check required parameters are present before `execute`
    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        for param in self.parameters().iter().filter(|p| p.required) {
            if arguments.get(&param.name).is_none_or(Value::is_null) {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required parameter '{}'",
                    param.name
                )));
            }
        }
        Ok(())
    }

    /// Descriptor advertised by `listTools`
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Build a parameter descriptor
pub fn param(name: &str, param_type: &str, description: &str, required: bool) -> ToolParameter {
    ToolParameter {
        name: name.to_string(),
        param_type: param_type.to_string(),
        description: description.to_string(),
        required,
    }
}

/// Non-empty string argument
pub fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match arguments.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::String(_)) => Err(ToolError::InvalidArguments(format!(
            "'{}' must not be empty",
            key
        ))),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
        None => Err(ToolError::InvalidArguments(format!(
            "missing required parameter '{}'",
            key
        ))),
    }
}

/// Numeric argument; numeric strings are accepted too
pub fn required_f64(arguments: &Value, key: &str) -> Result<f64, ToolError> {
    let value = arguments.get(key).ok_or_else(|| {
        ToolError::InvalidArguments(format!("missing required parameter '{}'", key))
    })?;
    number(value).ok_or_else(|| {
        ToolError::InvalidArguments(format!("'{}' must be a number, got {}", key, value))
    })
}

/// Optional integer argument
pub fn optional_i64(arguments: &Value, key: &str) -> Result<Option<i64>, ToolError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match number(value) {
            Some(n) if n.fract() == 0.0 => Ok(Some(n as i64)),
            _ => Err(ToolError::InvalidArguments(format!(
                "'{}' must be an integer, got {}",
                key, value
            ))),
        },
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
