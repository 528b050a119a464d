//! The seam to the language-model completion service.
//!
//! An agent never talks to a model directly. It builds a
//! [`CompletionRequest`] and acts on the [`Completion`] that comes back:
//! plain text ends the turn, a tool call is executed and folded back, and a
//! delegation hands the turn to a sub-agent.

use async_trait::async_trait;
use parley_core::{AgentId, Message, ToolCall, ToolDescriptor, ToolId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CompletionError;

/// A sub-agent as advertised to its parent's completion client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateDescriptor {
    pub id: AgentId,
    pub description: String,
}

/// Everything a completion service sees for one step of a turn.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Agent the completion is for.
    pub agent: AgentId,
    pub instruction: String,
    /// Session history so far, including tool messages from this turn.
    pub history: Vec<Message>,
    pub tools: Vec<ToolDescriptor>,
    pub delegates: Vec<DelegateDescriptor>,
    /// Failed attempts from this turn that are not recorded in the history,
    /// such as a delegation to an undeclared agent.
    pub observations: Vec<String>,
}

impl CompletionRequest {
    /// Text of the most recent user message, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|m| m.role() == parley_core::Role::User)
            .map(Message::text)
    }

    /// The most recent message, whoever wrote it.
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }
}

/// What the completion service asks the agent to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Completion {
    /// Final text for this turn.
    Text { text: String },
    /// Invoke a tool and report back.
    ToolCall(ToolCall),
    /// Hand the turn to a sub-agent.
    Delegate { agent: AgentId },
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Completion::Text { text: text.into() }
    }

    pub fn tool_call(tool: ToolId, input: Value) -> Self {
        Completion::ToolCall(ToolCall::new(tool, input))
    }

    pub fn delegate(agent: AgentId) -> Self {
        Completion::Delegate { agent }
    }
}

/// A language-model completion service.
///
/// Implementations own their transport and retry policy; a failure is
/// reported once and the agent degrades its response instead of retrying.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;
}
