//! Closure-backed tools.

use async_trait::async_trait;
use futures::future::BoxFuture;
use parley_core::{ExecutionResult, Tool, ToolId, empty_object_schema};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, ExecutionResult> + Send + Sync>;

/// A tool whose behavior is an async closure.
///
/// ```rust
/// use parley_core::{ExecutionResult, Tool, ToolId};
/// use parley_tools::FunctionTool;
/// use serde_json::json;
///
/// let double = FunctionTool::from_fn(ToolId::parse("double").unwrap(), |input| {
///     let n = input.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
///     ExecutionResult::success(json!(n * 2))
/// })
/// .with_description("Doubles an integer")
/// .with_schema(json!({
///     "type": "object",
///     "properties": { "n": { "type": "integer" } },
///     "required": ["n"]
/// }));
///
/// assert_eq!(double.description(), "Doubles an integer");
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    id: ToolId,
    description: String,
    schema: Value,
    handler: Handler,
}

impl FunctionTool {
    /// Wrap an async handler.
    pub fn new<F, Fut>(id: ToolId, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ExecutionResult> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |input| Box::pin(handler(input)));
        Self {
            id,
            description: String::new(),
            schema: empty_object_schema(),
            handler,
        }
    }

    /// Wrap a synchronous handler.
    pub fn from_fn<F>(id: ToolId, handler: F) -> Self
    where
        F: Fn(Value) -> ExecutionResult + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(id, move |input| {
            let handler = Arc::clone(&handler);
            async move { handler(input) }
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the default empty-object schema.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn id(&self) -> &ToolId {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn call(&self, input: Value) -> ExecutionResult {
        (self.handler)(input).await
    }
}
