//! # Parley
//!
//! Parley runs turn-taking conversations between language-model agents. A
//! conversation lives in a session keyed by app, user and session id; each
//! user message starts a run in which one or more agents take turns, call
//! tools and delegate to declared sub-agents until the run waits for more
//! input or a termination condition ends it.
//!
//! ## Core Components
//!
//! - **[ToolRegistry]**: named tools with input schemas and a call deadline
//! - **[Agent]**: instruction, tools, sub-agents and a [`CompletionClient`]
//! - **[InMemorySessionStore]**: per-session history with exclusive turns
//! - **[TurnCoordinator]**: single-agent or round-robin turn order and
//!   termination
//! - **[Runner]**: the streaming loop tying the pieces together
//!
//! ## Quick Start
//!
//! ```rust
//! use parley::{Agent, AgentTeam, InMemoryToolRegistry, Runner, SayHelloTool};
//! use parley::offline::ToolReporter;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let say_hello = "say_hello".parse().unwrap();
//! let greeter = Agent::new(
//!     "greeting_agent".parse().unwrap(),
//!     Arc::new(ToolReporter::greeting(say_hello)),
//! )
//! .with_tool("say_hello".parse().unwrap());
//!
//! let tools = InMemoryToolRegistry::new()
//!     .with_tool(Arc::new(SayHelloTool::new()))
//!     .unwrap();
//!
//! let mut runner = Runner::builder()
//!     .team(AgentTeam::new([greeter]).unwrap())
//!     .tools(Arc::new(tools))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(runner.ask("Hi, my name is Ada").await.unwrap(), "Hello, Ada!");
//! # });
//! ```

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use parley_agent as agent;
pub use parley_agent::offline;
pub use parley_core as core;
pub use parley_session as session;
pub use parley_tools as tools;

// ============================================================================
// Identifiers and messages
// ============================================================================

pub use parley_core::{
    AgentId, AppId, Author, IdValidationError, Message, Role, SessionId, SessionKey, ToolId,
    UserId,
};

// ============================================================================
// Tools
// ============================================================================

pub use parley_core::{
    ExecutionResult, FailureReason, Tool, ToolCall, ToolDescriptor, ToolOutcome,
};
pub use parley_tools::{
    DEFAULT_TOOL_TIMEOUT, FunctionTool, GetRedditNewsTool, GetWeatherTool, InMemoryToolRegistry,
    InputSchema, PostSource, RedditClient, RedditCredentials, SayGoodbyeTool, SayHelloTool,
    ToolRegistry,
};

// ============================================================================
// Sessions
// ============================================================================

pub use parley_session::{InMemorySessionStore, Session, SessionGuard};

// ============================================================================
// Agents, coordination and the runner
// ============================================================================

pub use parley_agent::{
    Agent, AgentTeam, CancellationToken, Completion, CompletionClient, CompletionHook,
    CompletionRequest, CoordinatorState, DEGRADED_RESPONSE, DelegateDescriptor, END_OF_EDIT_MARK,
    NO_FINAL_RESPONSE, RunOutcome, Runner, RunnerBuilder, StopReason, TerminationCondition,
    TerminationReason, TruncateAtMarker, TurnContext, TurnCoordinator, TurnLimits, TurnMode,
    TurnVerdict,
};

// ============================================================================
// Configuration
// ============================================================================

pub use parley_agent::{AgentConfig, ModelConfig, ParleyConfig, RunnerConfig, Secret, SecretString};

// ============================================================================
// Errors
// ============================================================================

pub use parley_agent::{AgentError, CompletionError, ConfigError, RunnerError};
pub use parley_core::{SessionError, SessionResult, ToolError, ToolResult};
