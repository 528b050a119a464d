use async_trait::async_trait;
use futures::FutureExt;
use parley_core::{ExecutionResult, Tool, ToolDescriptor, ToolError, ToolId, ToolResult};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::schema::InputSchema;

/// Default deadline for a single tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for looking up and invoking tools by id.
///
/// Registries are populated during setup and then shared read-only between
/// agents, so invocation takes `&self`.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Invoke a registered tool.
    ///
    /// # Errors
    ///
    /// - [`ToolError::UnknownTool`] if no tool has this id
    /// - [`ToolError::InvalidInput`] if `input` fails the tool's schema
    /// - [`ToolError::Execution`] if the handler panics
    /// - [`ToolError::Timeout`] if the handler exceeds the registry deadline
    ///
    /// A handler that reports its own failure returns
    /// `Ok(ExecutionResult::Failure { .. })`.
    async fn invoke(&self, tool: &ToolId, input: Value) -> ToolResult<ExecutionResult>;

    /// Descriptor of one tool.
    fn descriptor(&self, tool: &ToolId) -> Option<ToolDescriptor>;

    /// Descriptors of every registered tool, ordered by id.
    fn descriptors(&self) -> Vec<ToolDescriptor>;

    fn contains(&self, tool: &ToolId) -> bool {
        self.descriptor(tool).is_some()
    }
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    schema: InputSchema,
}

/// In-memory tool registry for local tool storage and dispatch.
///
/// ```rust
/// use parley_tools::{InMemoryToolRegistry, ToolRegistry, SayHelloTool};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let registry = InMemoryToolRegistry::new()
///     .with_tool(Arc::new(SayHelloTool::new()))
///     .expect("unique tool");
///
/// let tool = "say_hello".parse().unwrap();
/// let result = registry.invoke(&tool, json!({"name": "there"})).await.unwrap();
/// assert_eq!(result.payload(), Some(&json!("Hello, there!")));
/// # });
/// ```
pub struct InMemoryToolRegistry {
    tools: HashMap<ToolId, RegisteredTool>,
    timeout: Duration,
}

impl Default for InMemoryToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryToolRegistry {
    /// Create an empty registry with the default timeout.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Set the per-invocation deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// [`ToolError::DuplicateTool`] if the id is taken, or
    /// [`ToolError::InvalidSchema`] if the tool's schema is malformed.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> ToolResult<()> {
        let id = tool.id().clone();
        if self.tools.contains_key(&id) {
            return Err(ToolError::DuplicateTool { tool: id });
        }

        let schema = InputSchema::compile(&tool.input_schema()).map_err(|reason| {
            ToolError::InvalidSchema {
                tool: id.clone(),
                reason,
            }
        })?;

        debug!(tool = %id, "Registered tool");
        self.tools.insert(id, RegisteredTool { tool, schema });
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> ToolResult<Self> {
        self.register(tool)?;
        Ok(self)
    }

    /// Register several tools, stopping at the first error.
    pub fn with_tools(
        mut self,
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> ToolResult<Self> {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool ids, sorted.
    pub fn tool_ids(&self) -> Vec<ToolId> {
        let mut ids: Vec<ToolId> = self.tools.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ToolRegistry for InMemoryToolRegistry {
    async fn invoke(&self, tool: &ToolId, input: Value) -> ToolResult<ExecutionResult> {
        let entry = self
            .tools
            .get(tool)
            .ok_or_else(|| ToolError::UnknownTool { tool: tool.clone() })?;

        entry
            .schema
            .validate(&input)
            .map_err(|reason| ToolError::InvalidInput {
                tool: tool.clone(),
                reason,
            })?;

        debug!(tool = %tool, input = %input, "Invoking tool");

        let call = AssertUnwindSafe(entry.tool.call(input)).catch_unwind();
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                warn!(tool = %tool, error = %message, "Tool handler panicked");
                Err(ToolError::Execution {
                    tool: tool.clone(),
                    message,
                })
            }
            Err(_) => {
                warn!(tool = %tool, timeout_ms = self.timeout.as_millis() as u64, "Tool timed out");
                Err(ToolError::Timeout {
                    tool: tool.clone(),
                    duration_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    fn descriptor(&self, tool: &ToolId) -> Option<ToolDescriptor> {
        self.tools.get(tool).map(|entry| entry.tool.descriptor())
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tool_ids()
            .iter()
            .filter_map(|id| self.descriptor(id))
            .collect()
    }

    fn contains(&self, tool: &ToolId) -> bool {
        self.tools.contains_key(tool)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
