//! Conversation messages.
//!
//! A [`Message`] is immutable once constructed; sessions only ever append
//! them, so every field is read through accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::identifiers::{AgentId, ToolId};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Input from the person driving the conversation
    User,
    /// Text produced by an agent turn
    Agent,
    /// Result of a tool invocation made by an agent
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Agent => f.write_str("agent"),
            Role::Tool => f.write_str("tool"),
        }
    }
}

/// Author of a message: the user or a specific agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum Author {
    User,
    Agent(AgentId),
}

impl Author {
    /// The agent id, if an agent wrote the message.
    pub fn agent_id(&self) -> Option<&AgentId> {
        match self {
            Author::User => None,
            Author::Agent(id) => Some(id),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::User => f.write_str("user"),
            Author::Agent(id) => write!(f, "{id}"),
        }
    }
}

/// One entry of a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    role: Role,
    author: Author,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool: Option<ToolId>,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn build(role: Role, author: Author, text: String, tool: Option<ToolId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            author,
            text,
            tool,
            timestamp: Utc::now(),
        }
    }

    /// A message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self::build(Role::User, Author::User, text.into(), None)
    }

    /// A finished agent response.
    pub fn agent(agent: AgentId, text: impl Into<String>) -> Self {
        Self::build(Role::Agent, Author::Agent(agent), text.into(), None)
    }

    /// The recorded outcome of a tool call made by `agent`.
    pub fn tool(agent: AgentId, tool: ToolId, text: impl Into<String>) -> Self {
        Self::build(Role::Tool, Author::Agent(agent), text.into(), Some(tool))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Tool invoked, for [`Role::Tool`] messages.
    pub fn tool_id(&self) -> Option<&ToolId> {
        self.tool.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_from_agent(&self, agent: &AgentId) -> bool {
        self.author.agent_id() == Some(agent)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tool {
            Some(tool) => write!(f, "[{} -> {}] {}", self.author, tool, self.text),
            None => write!(f, "[{}] {}", self.author, self.text),
        }
    }
}
