//! Tool registration and execution errors.

use thiserror::Error;

use crate::identifiers::ToolId;

/// Errors raised by a tool registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// A tool with this id is already registered.
    #[error("Tool '{tool}' is already registered")]
    DuplicateTool { tool: ToolId },

    /// No tool with this id is registered (or the caller may not use it).
    #[error("Tool '{tool}' not found in registry")]
    UnknownTool { tool: ToolId },

    /// The declared input schema is malformed.
    #[error("Tool '{tool}' has an invalid input schema: {reason}")]
    InvalidSchema { tool: ToolId, reason: String },

    /// The input does not satisfy the tool's schema.
    #[error("Tool '{tool}' received invalid input: {reason}")]
    InvalidInput { tool: ToolId, reason: String },

    /// The handler faulted instead of returning a result.
    #[error("Tool '{tool}' execution failed: {message}")]
    Execution { tool: ToolId, message: String },

    /// The handler did not finish in time.
    #[error("Tool '{tool}' timed out after {duration_ms}ms")]
    Timeout { tool: ToolId, duration_ms: u64 },
}

impl ToolError {
    /// The tool this error refers to.
    pub fn tool(&self) -> &ToolId {
        match self {
            ToolError::DuplicateTool { tool }
            | ToolError::UnknownTool { tool }
            | ToolError::InvalidSchema { tool, .. }
            | ToolError::InvalidInput { tool, .. }
            | ToolError::Execution { tool, .. }
            | ToolError::Timeout { tool, .. } => tool,
        }
    }

    /// Error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            ToolError::DuplicateTool { .. } => "DUPLICATE_TOOL",
            ToolError::UnknownTool { .. } => "UNKNOWN_TOOL",
            ToolError::InvalidSchema { .. } => "INVALID_SCHEMA",
            ToolError::InvalidInput { .. } => "INVALID_INPUT",
            ToolError::Execution { .. } => "TOOL_EXECUTION",
            ToolError::Timeout { .. } => "TOOL_TIMEOUT",
        }
    }
}

/// Result type for tool registry operations.
pub type ToolResult<T> = Result<T, ToolError>;
