use async_trait::async_trait;
use parley_core::{ExecutionResult, FailureReason, Tool, ToolId};
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::info;

/// Mock weather lookup for a handful of cities.
///
/// City names are normalized by lowercasing and dropping spaces, so
/// `"New York"` and `"newyork"` hit the same entry. The success payload is
/// `{"status": "success", "report": ...}`; unknown cities produce a failure
/// whose message apologizes for the missing data.
pub struct GetWeatherTool {
    id: ToolId,
    reports: HashMap<&'static str, &'static str>,
}

impl Default for GetWeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

impl GetWeatherTool {
    pub fn new() -> Self {
        let reports = HashMap::from([
            (
                "newyork",
                "The weather in New York is sunny with a temperature of 25°C.",
            ),
            (
                "london",
                "It's cloudy in London with a temperature of 15°C.",
            ),
            (
                "tokyo",
                "Tokyo is experiencing light rain and a temperature of 18°C.",
            ),
        ]);
        Self {
            id: ToolId::new_unchecked("get_weather"),
            reports,
        }
    }

    fn normalize(city: &str) -> String {
        city.to_lowercase().replace(' ', "")
    }

    /// The report for `city`, if the mock database has one.
    pub fn report_for(&self, city: &str) -> Option<&'static str> {
        self.reports.get(Self::normalize(city).as_str()).copied()
    }
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn id(&self) -> &ToolId {
        &self.id
    }

    fn description(&self) -> &str {
        "Retrieves the current weather report for a specified city."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "city": { "type": "string" } },
            "required": ["city"]
        })
    }

    async fn call(&self, input: Value) -> ExecutionResult {
        let Some(city) = input.get("city").and_then(Value::as_str) else {
            return ExecutionResult::failed(FailureReason::InvalidInput {
                message: "'city' must be a string".to_string(),
            });
        };
        info!(tool = "get_weather", city = %city, "Looking up weather");

        match self.report_for(city) {
            Some(report) => ExecutionResult::success(json!({
                "status": "success",
                "report": report,
            })),
            None => ExecutionResult::failure(format!(
                "Sorry, I don't have weather information for '{city}'."
            )),
        }
    }
}
