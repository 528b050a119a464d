//! The tutorial tools: the weather team's three tools and the subreddit
//! scout's `get_reddit_cs_news`.

mod greeting;
pub mod reddit;
mod weather;

pub use greeting::{SayGoodbyeTool, SayHelloTool};
pub use reddit::{GetRedditNewsTool, PostSource, RedditClient, RedditCredentials};
pub use weather::GetWeatherTool;

use parley_core::Tool;
use std::sync::Arc;

/// The weather team's tools, ready to register.
pub fn all() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetWeatherTool::new()),
        Arc::new(SayHelloTool::new()),
        Arc::new(SayGoodbyeTool::new()),
    ]
}
