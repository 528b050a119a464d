//! # Parley Testing
//!
//! Deterministic stand-ins for the external collaborators of a conversation.
//!
//! - [`ScriptedClient`]: a completion client that replays scripted
//!   completions or answers through a closure
//! - [`MockTool`]: a tool with canned responses and call tracking
//! - [`StaticPosts`]: fixed subreddit listings for the subreddit scout
//! - [`fixtures`]: the weather team, the subreddit scout and the
//!   primary/critic pair, ready to run
//!
//! ```rust
//! use parley_agent::{Completion, Runner};
//! use parley_testing::{ScriptedClient, fixtures};
//!
//! # tokio_test::block_on(async {
//! let (team, tools) = fixtures::weather_team();
//! let mut runner = Runner::builder()
//!     .team(team)
//!     .tools(tools)
//!     .root_agent(fixtures::agent_id("weather_agent_v2"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(runner.ask("Hello there!").await.unwrap(), "Hello, there!");
//! # });
//! ```

/// Ready-made teams and sessions.
pub mod fixtures;
/// Mock tools for predictable testing
pub mod mock_tools;
/// Scripted completion clients.
pub mod scripted;

pub use mock_tools::{MockTool, StaticPosts};
pub use scripted::ScriptedClient;
