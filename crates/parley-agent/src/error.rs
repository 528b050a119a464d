//! Error types for agents, configuration and the runner.

use parley_core::{AgentId, SessionError, ToolId};
use thiserror::Error;

use crate::termination::TerminationReason;

/// Failures reported by a completion service.
///
/// These never abort a run: the agent turns them into a degraded response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("Completion service unavailable: {0}")]
    Unavailable(String),

    #[error("Completion request timed out after {0}ms")]
    Timeout(u64),

    #[error("Completion service returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompletionError::Unavailable(_) | CompletionError::Timeout(_)
        )
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            CompletionError::Unavailable(_) => "COMPLETION_UNAVAILABLE",
            CompletionError::Timeout(_) => "COMPLETION_TIMEOUT",
            CompletionError::InvalidResponse(_) => "COMPLETION_INVALID_RESPONSE",
        }
    }
}

/// Errors that escape an agent turn.
///
/// Tool and completion faults are folded back into the conversation, so only
/// programmer errors end up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// An agent was asked to respond twice within one turn.
    #[error("Delegation cycle detected: {}", format_chain(.chain))]
    DelegationCycle { chain: Vec<AgentId> },

    /// The team has no agent with this id.
    #[error("Agent '{0}' is not part of the team")]
    UnknownAgent(AgentId),
}

impl AgentError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AgentError::DelegationCycle { .. } => "DELEGATION_CYCLE",
            AgentError::UnknownAgent(_) => "UNKNOWN_AGENT",
        }
    }
}

fn format_chain(chain: &[AgentId]) -> String {
    chain
        .iter()
        .map(AgentId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Invalid or incomplete setup, reported before any turn executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse TOML config: {0}")]
    Parse(String),

    #[error("No model id configured")]
    MissingModel,

    #[error("Provider '{provider}' needs credentials in environment variable '{env_var}'")]
    MissingCredentials { provider: String, env_var: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Agent '{0}' is defined more than once")]
    DuplicateAgent(AgentId),

    #[error("Agent '{agent}' lists unknown sub-agent '{sub_agent}'")]
    UnknownSubAgent { agent: AgentId, sub_agent: AgentId },

    #[error("Agent '{agent}' uses tool '{tool}' which is not registered")]
    UnregisteredTool { agent: AgentId, tool: ToolId },

    #[error("Turn participant '{0}' is not part of the team")]
    UnknownParticipant(AgentId),

    #[error("Runner needs {0}")]
    Missing(&'static str),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CONFIG_READ",
            ConfigError::Parse(_) => "CONFIG_PARSE",
            ConfigError::MissingModel => "MISSING_MODEL",
            ConfigError::MissingCredentials { .. } => "MISSING_CREDENTIALS",
            ConfigError::InvalidValue { .. } => "INVALID_CONFIG_VALUE",
            ConfigError::DuplicateAgent(_) => "DUPLICATE_AGENT",
            ConfigError::UnknownSubAgent { .. } => "UNKNOWN_SUB_AGENT",
            ConfigError::UnregisteredTool { .. } => "UNREGISTERED_TOOL",
            ConfigError::UnknownParticipant(_) => "UNKNOWN_PARTICIPANT",
            ConfigError::Missing(_) => "INCOMPLETE_RUNNER",
        }
    }
}

/// Errors surfaced at the runner boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The conversation already ended; call `reset` to start over.
    #[error("Conversation has terminated ({reason}); reset the runner to continue")]
    ConversationTerminated { reason: TerminationReason },
}

impl RunnerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            RunnerError::Configuration(err) => err.error_code(),
            RunnerError::Agent(err) => err.error_code(),
            RunnerError::Session(err) => err.error_code(),
            RunnerError::ConversationTerminated { .. } => "CONVERSATION_TERMINATED",
        }
    }
}
