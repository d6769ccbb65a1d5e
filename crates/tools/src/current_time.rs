//! Current time tool, fixed to the deployment timezone (Asia/Tokyo).

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};

use coppertail_core::error::ToolError;
use coppertail_core::tool::{Tool, ToolResult};

const JST_OFFSET_SECS: i32 = 9 * 3600;

pub struct CurrentTimeTool {
    offset: FixedOffset,
}

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self {
            offset: FixedOffset::east_opt(JST_OFFSET_SECS).expect("valid JST offset"),
        }
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in the Asia/Tokyo timezone, ISO 8601 formatted."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let now = Utc::now().with_timezone(&self.offset);
        Ok(ToolResult::text(now.to_rfc3339()))
    }
}
