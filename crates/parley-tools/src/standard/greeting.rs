use async_trait::async_trait;
use parley_core::{ExecutionResult, Tool, ToolId, empty_object_schema};
use serde_json::{Value, json};
use tracing::info;

/// Greets someone by name, defaulting to "there".
pub struct SayHelloTool {
    id: ToolId,
}

impl Default for SayHelloTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SayHelloTool {
    pub fn new() -> Self {
        Self {
            id: ToolId::new_unchecked("say_hello"),
        }
    }
}

#[async_trait]
impl Tool for SayHelloTool {
    fn id(&self) -> &ToolId {
        &self.id
    }

    fn description(&self) -> &str {
        "Provides a simple greeting, optionally addressing the user by name."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        })
    }

    async fn call(&self, input: Value) -> ExecutionResult {
        let name = input
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("there");
        info!(tool = "say_hello", name = %name, "Greeting");
        ExecutionResult::success(format!("Hello, {name}!"))
    }
}

/// Says goodbye. Takes no input.
pub struct SayGoodbyeTool {
    id: ToolId,
}

impl Default for SayGoodbyeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SayGoodbyeTool {
    pub fn new() -> Self {
        Self {
            id: ToolId::new_unchecked("say_goodbye"),
        }
    }
}

#[async_trait]
impl Tool for SayGoodbyeTool {
    fn id(&self) -> &ToolId {
        &self.id
    }

    fn description(&self) -> &str {
        "Provides a simple farewell message to conclude the conversation."
    }

    fn input_schema(&self) -> Value {
        empty_object_schema()
    }

    async fn call(&self, _input: Value) -> ExecutionResult {
        info!(tool = "say_goodbye", "Saying goodbye");
        ExecutionResult::success("Goodbye! Have a great day.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hello_uses_name_or_default() {
        let tool = SayHelloTool::new();
        assert_eq!(
            tool.call(json!({"name": "there"})).await.payload(),
            Some(&json!("Hello, there!"))
        );
        assert_eq!(
            tool.call(json!({"name": "Ada"})).await.payload(),
            Some(&json!("Hello, Ada!"))
        );
        assert_eq!(
            tool.call(Value::Null).await.payload(),
            Some(&json!("Hello, there!"))
        );
    }

    #[tokio::test]
    async fn goodbye_is_fixed() {
        assert_eq!(
            SayGoodbyeTool::new().call(json!({})).await.payload(),
            Some(&json!("Goodbye! Have a great day."))
        );
    }
}
