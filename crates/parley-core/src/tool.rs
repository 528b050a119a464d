//! Tool trait and execution results.
//!
//! Tools are the external capabilities an agent can invoke: a mock weather
//! lookup, a greeting formatter, an HTTP call. Each tool declares an input
//! schema and returns a structured [`ExecutionResult`] instead of panicking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::identifiers::ToolId;

/// Categorized failure reasons reported by a tool handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    /// Invalid or malformed input provided to the tool
    InvalidInput { message: String },
    /// Requested resource does not exist
    NotFound { resource: String },
    /// Network-related failure
    NetworkError { message: String },
    /// Operation exceeded its deadline
    Timeout { operation: String },
    /// Internal tool error or unexpected state
    InternalError { message: String },
    /// Tool-specific failure with its own category
    Custom { category: String, message: String },
}

impl FailureReason {
    /// Human-readable error message.
    pub fn message(&self) -> String {
        match self {
            FailureReason::InvalidInput { message } => format!("Invalid input: {}", message),
            FailureReason::NotFound { resource } => format!("Not found: {}", resource),
            FailureReason::NetworkError { message } => format!("Network error: {}", message),
            FailureReason::Timeout { operation } => format!("Timeout: {}", operation),
            FailureReason::InternalError { message } => message.clone(),
            FailureReason::Custom { category, message } => format!("{}: {}", category, message),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// The result a tool handler hands back.
///
/// `Failure` is a handled, structured error (an unknown city, a missing
/// argument). Faults the handler cannot report itself, such as panics and
/// timeouts, are surfaced by the registry as errors instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success { payload: Value },
    Failure { reason: FailureReason },
}

impl ExecutionResult {
    /// Successful result carrying a JSON payload.
    pub fn success(payload: impl Into<Value>) -> Self {
        ExecutionResult::Success {
            payload: payload.into(),
        }
    }

    /// Failed result with a structured reason.
    pub fn failed(reason: FailureReason) -> Self {
        ExecutionResult::Failure { reason }
    }

    /// Failed result from a plain message, reported as an internal error.
    pub fn failure(message: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            reason: FailureReason::InternalError {
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionResult::Failure { .. })
    }

    /// The payload, if the call succeeded.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ExecutionResult::Success { payload } => Some(payload),
            ExecutionResult::Failure { .. } => None,
        }
    }

    /// The failure reason, if the call failed.
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            ExecutionResult::Success { .. } => None,
            ExecutionResult::Failure { reason } => Some(reason),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.failure_reason().map(FailureReason::message)
    }
}

/// Wire shape of a tool outcome as folded back into a conversation.
///
/// Serializes to `{"status":"success","payload":...}` or
/// `{"status":"error","error_message":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { payload: Value },
    Error { error_message: String },
}

impl ToolOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        ToolOutcome::Error {
            error_message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    /// Text form of the payload: bare strings are returned unquoted.
    pub fn payload_text(&self) -> Option<String> {
        match self {
            ToolOutcome::Success {
                payload: Value::String(s),
            } => Some(s.clone()),
            ToolOutcome::Success { payload } => Some(payload.to_string()),
            ToolOutcome::Error { .. } => None,
        }
    }

    /// JSON text used as the body of a tool message.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","error_message":"unserializable outcome: {e}"}}"#)
        })
    }
}

impl From<ExecutionResult> for ToolOutcome {
    fn from(result: ExecutionResult) -> Self {
        match result {
            ExecutionResult::Success { payload } => ToolOutcome::Success { payload },
            ExecutionResult::Failure { reason } => ToolOutcome::Error {
                error_message: reason.message(),
            },
        }
    }
}

/// Public description of a tool, offered to completion services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub description: String,
    pub input_schema: Value,
}

/// A request to run `tool` with `input`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: ToolId,
    #[serde(default)]
    pub input: Value,
}

impl ToolCall {
    pub fn new(tool: ToolId, input: Value) -> Self {
        Self { tool, input }
    }
}

/// Schema accepted by tools that take no arguments.
pub fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// An external capability agents can invoke.
///
/// ```rust
/// use async_trait::async_trait;
/// use parley_core::identifiers::ToolId;
/// use parley_core::tool::{ExecutionResult, Tool};
/// use serde_json::Value;
///
/// struct Shout {
///     id: ToolId,
/// }
///
/// #[async_trait]
/// impl Tool for Shout {
///     fn id(&self) -> &ToolId {
///         &self.id
///     }
///
///     async fn call(&self, input: Value) -> ExecutionResult {
///         match input.get("text").and_then(Value::as_str) {
///             Some(text) => ExecutionResult::success(text.to_uppercase()),
///             None => ExecutionResult::failure("missing 'text'"),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier the registry routes calls by.
    fn id(&self) -> &ToolId;

    /// Human-readable description, published to completion services.
    fn description(&self) -> &str {
        ""
    }

    /// JSON schema of the input object.
    fn input_schema(&self) -> Value {
        empty_object_schema()
    }

    /// Execute the tool.
    async fn call(&self, input: Value) -> ExecutionResult;

    /// Descriptor assembled from the methods above.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            id: self.id().clone(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}
