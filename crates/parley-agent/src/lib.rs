//! # Parley Agent
//!
//! Agents, turn coordination and the conversation runner.
//!
//! - [`CompletionClient`]: the seam to a language-model completion service
//! - [`Agent`] and [`AgentTeam`]: conversational actors with tools and
//!   delegates
//! - [`TerminationCondition`] and [`TurnCoordinator`]: who speaks next and
//!   when the conversation ends
//! - [`Runner`]: the streaming conversation loop over one session
//! - [`ParleyConfig`]: TOML and environment configuration
//! - [`offline`]: rule-based completion clients that need no model

pub mod agent;
pub mod completion;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod offline;
pub mod runner;
pub mod secret;
pub mod team;
pub mod termination;

#[cfg(test)]
mod test_support;

pub use agent::{Agent, DEGRADED_RESPONSE, TurnContext, TurnLimits};
pub use completion::{Completion, CompletionClient, CompletionRequest, DelegateDescriptor};
pub use config::{AgentConfig, ModelConfig, ParleyConfig, RunnerConfig};
pub use coordinator::{CoordinatorState, TurnCoordinator, TurnMode, TurnVerdict};
pub use error::{AgentError, CompletionError, ConfigError, RunnerError};
pub use hooks::{CompletionHook, END_OF_EDIT_MARK, TruncateAtMarker};
pub use runner::{NO_FINAL_RESPONSE, RunOutcome, Runner, RunnerBuilder, StopReason};
pub use secret::{Secret, SecretString};
pub use team::AgentTeam;
pub use termination::{TerminationCondition, TerminationReason};
pub use tokio_util::sync::CancellationToken;
