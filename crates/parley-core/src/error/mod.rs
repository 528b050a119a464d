//! Error Types
//!
//! Domain errors shared by the tool registry and the session store:
//! - `tool`: registration, lookup, validation and execution failures
//! - `session`: session lifecycle failures

mod session;
mod tool;

pub use session::{SessionError, SessionResult};
pub use tool::{ToolError, ToolResult};
