//! Weather lookup tool — serves a fixed city table.
//!
//! The upstream weather provider is not part of this system; the table
//! covers the cities the deployment cares about and everything else gets
//! an "unavailable" answer in the same language as the data.

use async_trait::async_trait;
use tracing::info;

use coppertail_core::error::ToolError;
use coppertail_core::tool::{Tool, ToolResult};

pub struct WeatherLookupTool;

fn city_weather(city: &str) -> Option<&'static str> {
    match city {
        "Tokyo" | "東京" => Some("晴れ、気温25度"),
        "Osaka" | "大阪" => Some("曇り、気温22度"),
        "New York" => Some("Rainy, 18°C"),
        "London" => Some("Foggy, 15°C"),
        _ => None,
    }
}

#[async_trait]
impl Tool for WeatherLookupTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a specified city."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The name of the city"
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let city = arguments["city"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'city' argument".into()))?;

        info!(city, tool = "get_weather", "Fetching weather");

        let output = match city_weather(city) {
            Some(weather) => weather.to_string(),
            None => format!("{city}の天気情報は現在利用できません"),
        };
        Ok(ToolResult::text(output))
    }
}
