//! # Parley Tools
//!
//! The tool registry agents invoke tools through, plus the tutorial tools
//! (`get_weather`, `say_hello`, `say_goodbye`, `get_reddit_cs_news`).
//!
//! - [`InMemoryToolRegistry`]: id-keyed registry with schema checks and a
//!   per-call timeout
//! - [`FunctionTool`]: wraps a closure as a [`Tool`](parley_core::Tool)
//! - [`schema`]: compiled JSON Schemas tools declare their input with

/// Closure-backed tools.
pub mod function;
/// Tool registry trait and the in-memory implementation.
pub mod registry;
/// Input schema compilation and validation.
pub mod schema;
/// Tutorial tools.
pub mod standard;

pub use function::FunctionTool;
pub use registry::{DEFAULT_TOOL_TIMEOUT, InMemoryToolRegistry, ToolRegistry};
pub use schema::InputSchema;
pub use standard::{
    GetRedditNewsTool, GetWeatherTool, PostSource, RedditClient, RedditCredentials, SayGoodbyeTool,
    SayHelloTool,
};
