//! Web search tool — thin adapter over an external search API.
//!
//! The API key is resolved through the secret cache on every call, so key
//! rotation takes effect within the cache's freshness window. The HTTP call
//! is single-attempt with its own timeout; a hung search must not stall the
//! invocation indefinitely.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use coppertail_config::SecretCache;
use coppertail_core::error::ToolError;
use coppertail_core::tool::{Tool, ToolResult};

/// The external search backend.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, query: &str) -> Result<Value, ToolError>;
}

/// A search backend speaking a JSON-over-HTTP protocol.
pub struct HttpSearchApi {
    client: reqwest::Client,
    base_url: String,
    secrets: Arc<SecretCache>,
    secret_name: String,
    timeout_secs: u64,
}

impl HttpSearchApi {
    pub fn new(
        base_url: impl Into<String>,
        secrets: Arc<SecretCache>,
        secret_name: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            secrets,
            secret_name: secret_name.into(),
            timeout_secs,
        }
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search(&self, query: &str) -> Result<Value, ToolError> {
        let api_key =
            self.secrets
                .get(&self.secret_name)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "web_search".into(),
                    reason: e.to_string(),
                })?;

        let response = self
            .client
            .post(&self.base_url)
            .json(&serde_json::json!({"api_key": api_key, "query": query}))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout {
                        tool_name: "web_search".into(),
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    ToolError::ExecutionFailed {
                        tool_name: "web_search".into(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Search API returned error");
            return Err(ToolError::ExecutionFailed {
                tool_name: "web_search".into(),
                reason: format!("search API returned {status}"),
            });
        }

        response.json().await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: "web_search".into(),
            reason: format!("failed to parse search response: {e}"),
        })
    }
}

/// The tool the search sub-agent is bound to.
pub struct WebSearchTool {
    api: Arc<dyn SearchApi>,
}

impl WebSearchTool {
    pub fn new(api: Arc<dyn SearchApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Perform a web search and return the raw search results."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query string"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        info!(query, tool = "web_search", "Performing web search");

        let results = self.api.search(query).await?;
        let output = serde_json::to_string(&results)
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "web_search".into(),
                reason: e.to_string(),
            })?;

        Ok(ToolResult {
            output,
            data: Some(results),
        })
    }
}
