//! # Mock Tools for Testing
//!
//! Tools that return predictable responses and remember how they were
//! called.

use async_trait::async_trait;
use parley_core::{ExecutionResult, Tool, ToolId};
use parley_tools::standard::reddit::{FetchError, PostSource};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock tool that returns predefined responses keyed by input.
///
/// Inputs are matched by their JSON text, so `{"city": "London"}` matches
/// exactly that object.
#[derive(Debug, Clone)]
pub struct MockTool {
    id: ToolId,
    responses: HashMap<String, ExecutionResult>,
    default_response: Option<ExecutionResult>,
    delay: Option<Duration>,
    call_history: Arc<Mutex<Vec<Value>>>,
}

impl MockTool {
    pub fn new(id: ToolId) -> Self {
        Self {
            id,
            responses: HashMap::new(),
            default_response: None,
            delay: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Succeed with `payload` when called with `input`.
    pub fn with_response(mut self, input: Value, payload: impl Into<Value>) -> Self {
        self.responses
            .insert(input.to_string(), ExecutionResult::success(payload));
        self
    }

    /// Fail with `error` when called with `input`.
    pub fn with_failure(mut self, input: Value, error: impl Into<String>) -> Self {
        self.responses
            .insert(input.to_string(), ExecutionResult::failure(error));
        self
    }

    /// Response for any unmatched input.
    pub fn with_default_response(mut self, payload: impl Into<Value>) -> Self {
        self.default_response = Some(ExecutionResult::success(payload));
        self
    }

    pub fn with_default_failure(mut self, error: impl Into<String>) -> Self {
        self.default_response = Some(ExecutionResult::failure(error));
        self
    }

    /// Sleep before answering, to exercise registry timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.history().len()
    }

    /// Inputs this tool has received, oldest first.
    pub fn call_history(&self) -> Vec<Value> {
        self.history().clone()
    }

    pub fn was_called_with(&self, input: &Value) -> bool {
        self.history().contains(input)
    }

    pub fn reset(&self) {
        self.history().clear();
    }

    fn history(&self) -> std::sync::MutexGuard<'_, Vec<Value>> {
        // A poisoned history only means another test thread panicked mid-push.
        self.call_history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Tool for MockTool {
    fn id(&self) -> &ToolId {
        &self.id
    }

    fn description(&self) -> &str {
        "Mock tool with canned responses"
    }

    async fn call(&self, input: Value) -> ExecutionResult {
        self.history().push(input.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(response) = self.responses.get(&input.to_string()) {
            response.clone()
        } else if let Some(default) = &self.default_response {
            default.clone()
        } else {
            ExecutionResult::success(json!({ "mock": self.id.as_str(), "input": input }))
        }
    }
}

/// Post source with fixed listings per subreddit, for the subreddit scout.
///
/// Subreddits without a listing come back empty.
#[derive(Debug, Clone, Default)]
pub struct StaticPosts {
    listings: HashMap<String, Vec<String>>,
    requests: Arc<Mutex<Vec<(String, u64)>>>,
}

impl StaticPosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing<I, S>(mut self, subreddit: &str, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.listings.insert(
            subreddit.to_lowercase(),
            titles.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// `(subreddit, limit)` pairs requested so far, oldest first.
    pub fn requests(&self) -> Vec<(String, u64)> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl PostSource for StaticPosts {
    async fn hot_titles(&self, subreddit: &str, limit: u64) -> Result<Vec<String>, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((subreddit.to_string(), limit));

        let titles = self
            .listings
            .get(&subreddit.to_lowercase())
            .map(|titles| titles.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default();
        Ok(titles)
    }
}
