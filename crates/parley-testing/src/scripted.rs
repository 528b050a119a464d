use async_trait::async_trait;
use parley_agent::{Completion, CompletionClient, CompletionError, CompletionRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<Completion, CompletionError> + Send + Sync>;

/// A completion client driven by a script instead of a model.
///
/// Queued completions are served first, oldest first. Once the queue is
/// empty the fallback answers: a responder closure if one was given,
/// otherwise a fixed text. Every request is recorded for inspection.
pub struct ScriptedClient {
    queue: Mutex<VecDeque<Result<Completion, CompletionError>>>,
    fallback: Responder,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    /// Serve `steps`, then answer `"done"`.
    pub fn new(steps: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            queue: Mutex::new(steps.into_iter().map(Ok).collect()),
            fallback: Box::new(|_| Ok(Completion::text("done"))),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new([]).with_fallback(move |_| Ok(Completion::text(text.clone())))
    }

    /// Answer every request through `respond`.
    pub fn from_fn<F>(respond: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Completion + Send + Sync + 'static,
    {
        Self::new([]).with_fallback(move |request| Ok(respond(request)))
    }

    /// Fail every request with `error`.
    pub fn failing(error: CompletionError) -> Self {
        Self::new([]).with_fallback(move |_| Err(error.clone()))
    }

    /// Queue a failure after the steps already queued.
    pub fn then_fail(self, error: CompletionError) -> Self {
        self.lock_queue().push_back(Err(error));
        self
    }

    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<Completion, CompletionError> + Send + Sync + 'static,
    {
        self.fallback = Box::new(fallback);
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Result<Completion, CompletionError>>> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let queued = self.lock_queue().pop_front();
        let response = match queued {
            Some(response) => response,
            None => (self.fallback)(&request),
        };
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
        response
    }
}

impl std::fmt::Debug for ScriptedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedClient")
            .field("queued", &self.lock_queue().len())
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{AgentId, Message};

    fn request(user: &str) -> CompletionRequest {
        CompletionRequest {
            agent: AgentId::new_unchecked("primary"),
            instruction: String::new(),
            history: vec![Message::user(user)],
            tools: Vec::new(),
            delegates: Vec::new(),
            observations: Vec::new(),
        }
    }

    #[tokio::test]
    async fn queue_then_fallback() {
        let client = ScriptedClient::new([Completion::text("first")])
            .then_fail(CompletionError::Timeout(10));

        assert_eq!(client.complete(request("a")).await, Ok(Completion::text("first")));
        assert_eq!(
            client.complete(request("b")).await,
            Err(CompletionError::Timeout(10))
        );
        assert_eq!(client.complete(request("c")).await, Ok(Completion::text("done")));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn responder_sees_the_request() {
        let client = ScriptedClient::from_fn(|request| {
            Completion::text(request.last_user_text().unwrap_or_default().to_uppercase())
        });
        assert_eq!(
            client.complete(request("shout")).await,
            Ok(Completion::text("SHOUT"))
        );
        assert_eq!(client.requests()[0].history.len(), 1);
    }

    #[tokio::test]
    async fn failing_always_fails() {
        let client = ScriptedClient::failing(CompletionError::Unavailable("offline".into()));
        assert!(client.complete(request("a")).await.is_err());
        assert!(client.complete(request("b")).await.is_err());
    }
}
