use async_trait::async_trait;
use parley_core::{AgentId, SessionKey, ToolId};
use parley_tools::InMemoryToolRegistry;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::completion::{Completion, CompletionClient, CompletionRequest};
use crate::error::CompletionError;

/// Replays a fixed list of completions, then answers "done".
#[derive(Default)]
pub(crate) struct Script {
    steps: Mutex<VecDeque<Result<Completion, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl Script {
    pub(crate) fn new(steps: impl IntoIterator<Item = Completion>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().map(Ok).collect()),
            requests: Mutex::default(),
        })
    }

    pub(crate) fn failing(error: CompletionError) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::from([Err(error)])),
            requests: Mutex::default(),
        })
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for Script {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        self.requests.lock().unwrap().push(request);
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Completion::text("done")))
    }
}

pub(crate) fn id(name: &str) -> AgentId {
    AgentId::new_unchecked(name)
}

pub(crate) fn tool(name: &str) -> ToolId {
    ToolId::new_unchecked(name)
}

pub(crate) fn call(name: &str, input: Value) -> Completion {
    Completion::tool_call(tool(name), input)
}

pub(crate) fn key() -> SessionKey {
    SessionKey::parse("test_app", "user_1", "session_001").unwrap()
}

pub(crate) fn standard_tools() -> InMemoryToolRegistry {
    InMemoryToolRegistry::new()
        .with_tools(parley_tools::standard::all())
        .unwrap()
}
