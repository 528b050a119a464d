//! Input schema checking.
//!
//! Tools declare their input as a JSON Schema whose root is an object:
//!
//! ```json
//! {
//!   "type": "object",
//!   "properties": { "city": { "type": "string" } },
//!   "required": ["city"],
//!   "additionalProperties": false
//! }
//! ```
//!
//! The schema is compiled once at registration, so a malformed schema never
//! reaches a conversation.

use jsonschema::JSONSchema;
use serde_json::{Map, Value};

/// A compiled tool input schema.
pub struct InputSchema {
    compiled: JSONSchema,
}

impl InputSchema {
    /// Compile a schema document. The root must declare `"type": "object"`.
    pub fn compile(schema: &Value) -> Result<Self, String> {
        match schema.get("type").and_then(Value::as_str) {
            Some("object") => {}
            Some(other) => return Err(format!("root type must be 'object', got '{other}'")),
            None => return Err("schema must declare \"type\": \"object\"".to_string()),
        }

        let compiled = JSONSchema::compile(schema).map_err(|e| e.to_string())?;
        Ok(Self { compiled })
    }

    /// Check an input value. `null` is treated as an empty object.
    pub fn validate(&self, input: &Value) -> Result<(), String> {
        let empty = Value::Object(Map::new());
        let input = if input.is_null() { &empty } else { input };

        self.compiled.validate(input).map_err(|errors| {
            errors
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        })
    }
}

impl std::fmt::Debug for InputSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSchema").finish_non_exhaustive()
    }
}
