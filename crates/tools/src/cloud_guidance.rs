//! Cloud-resource guidance tool.
//!
//! Two contract points, both policy decisions rather than omissions:
//! failed cloud API calls are NOT retried unless `auto_retry` is enabled,
//! and the regional scope defaults from configuration when the user names
//! none. Both stay configurable.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use coppertail_core::error::ToolError;
use coppertail_core::tool::{Tool, ToolResult};

/// The external cloud API.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Describe the named resource kind in one region.
    async fn describe(&self, resource: &str, region: &str) -> Result<Value, ToolError>;
}

/// A canned cloud API for tests and local runs.
pub struct StubCloudApi;

#[async_trait]
impl CloudApi for StubCloudApi {
    async fn describe(&self, resource: &str, region: &str) -> Result<Value, ToolError> {
        let summary = match resource {
            "compute" => "2 instances running, 1 stopped",
            "storage" => "3 buckets, 120 GiB used",
            "database" => "1 cluster, healthy, 2 read replicas",
            _ => {
                return Err(ToolError::ExecutionFailed {
                    tool_name: "cloud_resource_inspect".into(),
                    reason: format!("unknown resource kind: {resource}"),
                })
            }
        };
        Ok(serde_json::json!({
            "resource": resource,
            "region": region,
            "summary": summary,
        }))
    }
}

/// The tool the cloud-guidance sub-agent is bound to.
pub struct CloudGuidanceTool {
    api: Arc<dyn CloudApi>,
    default_region: String,
    auto_retry: bool,
}

impl CloudGuidanceTool {
    pub fn new(api: Arc<dyn CloudApi>, default_region: impl Into<String>) -> Self {
        Self {
            api,
            default_region: default_region.into(),
            auto_retry: false,
        }
    }

    /// Opt in to a single retry on failure. Off by default.
    pub fn with_auto_retry(mut self, auto_retry: bool) -> Self {
        self.auto_retry = auto_retry;
        self
    }
}

#[async_trait]
impl Tool for CloudGuidanceTool {
    fn name(&self) -> &str {
        "cloud_resource_inspect"
    }

    fn description(&self) -> &str {
        "Inspect cloud resources of a given kind (compute, storage, database) in a region."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "resource": {
                    "type": "string",
                    "description": "The resource kind to inspect"
                },
                "region": {
                    "type": "string",
                    "description": "Region to inspect; the configured default applies when omitted"
                }
            },
            "required": ["resource"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let resource = arguments["resource"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'resource' argument".into()))?;
        let region = arguments["region"]
            .as_str()
            .unwrap_or(&self.default_region)
            .to_string();

        info!(resource, region = %region, tool = "cloud_resource_inspect", "Inspecting cloud resources");

        let mut outcome = self.api.describe(resource, &region).await;
        if outcome.is_err() && self.auto_retry {
            warn!(resource, "First cloud API call failed, retrying once");
            outcome = self.api.describe(resource, &region).await;
        }

        let described = outcome?;
        Ok(ToolResult {
            output: described.to_string(),
            data: Some(described),
        })
    }
}
