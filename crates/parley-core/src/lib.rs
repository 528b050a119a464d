//! # Parley Core
//!
//! Shared building blocks for Parley conversations: validated identifiers,
//! immutable [`Message`]s, the [`Tool`] trait and the error types used by
//! the tool registry and session store.

pub mod error;
pub mod identifiers;
pub mod message;
pub mod tool;

pub use error::{SessionError, SessionResult, ToolError, ToolResult};
pub use identifiers::{
    AgentId, AppId, IdValidationError, IdValidator, SessionId, SessionKey, ToolId, UserId,
};
pub use message::{Author, Message, Role};
pub use tool::{
    ExecutionResult, FailureReason, Tool, ToolCall, ToolDescriptor, ToolOutcome,
    empty_object_schema,
};
