//! OpenAI-compatible model binding.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM, and any other endpoint
//! speaking `/chat/completions`. Each `converse` call is one non-streaming
//! round; the envelope sequence the agent layer relays is synthesized from
//! the completed response, so callers see the same six event kinds
//! regardless of the backing runtime.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use coppertail_core::error::ModelError;
use coppertail_core::message::{ChatMessage, Role, ToolUse};
use coppertail_core::metrics::Usage;
use coppertail_core::model::{ModelClient, ModelRequest, ModelTurn};
use coppertail_core::result::StopReason;
use coppertail_core::tool::ToolDefinition;

/// An OpenAI-compatible model runtime.
pub struct OpenAiCompatModel {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatModel {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Convenience constructor for OpenRouter.
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Convenience constructor for a local Ollama endpoint.
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
        )
    }
}

fn to_api_messages(system_prompt: &str, messages: &[ChatMessage]) -> Vec<ApiMessage> {
    let mut api_messages = vec![ApiMessage {
        role: "system".into(),
        content: Some(system_prompt.to_string()),
        tool_calls: None,
        tool_call_id: None,
    }];
    api_messages.extend(messages.iter().map(|m| ApiMessage {
        role: match m.role {
            Role::User => "user".into(),
            Role::Assistant => "assistant".into(),
            Role::Tool => "tool".into(),
        },
        content: Some(m.content.clone()),
        tool_calls: if m.tool_uses.is_empty() {
            None
        } else {
            Some(
                m.tool_uses
                    .iter()
                    .map(|tu| ApiToolCall {
                        id: tu.id.clone(),
                        r#type: "function".into(),
                        function: ApiFunction {
                            name: tu.name.clone(),
                            arguments: tu.input.to_string(),
                        },
                    })
                    .collect(),
            )
        },
        tool_call_id: m.tool_use_id.clone(),
    }));
    api_messages
}

fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
    tools
        .iter()
        .map(|t| ApiToolDefinition {
            r#type: "function".into(),
            function: ApiToolFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        })
        .collect()
}

fn map_finish_reason(finish_reason: Option<&str>, has_tool_calls: bool) -> StopReason {
    match finish_reason {
        Some("tool_calls") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFiltered,
        Some("stop") | None => {
            if has_tool_calls {
                StopReason::ToolUse
            } else {
                StopReason::EndTurn
            }
        }
        Some(_) => StopReason::EndTurn,
    }
}

/// Synthesize the envelope sequence for one completed round.
fn round_events(content: &str, stop_reason: StopReason, usage: &Usage, latency_ms: u64) -> Vec<Value> {
    vec![
        serde_json::json!({"event": {"messageStart": {"role": "assistant"}}}),
        serde_json::json!({"event": {"contentBlockStart": {"contentBlockIndex": 0, "start": {}}}}),
        serde_json::json!({"event": {"contentBlockDelta": {
            "delta": {"text": content},
            "contentBlockIndex": 0
        }}}),
        serde_json::json!({"event": {"contentBlockStop": {"contentBlockIndex": 0}}}),
        serde_json::json!({"event": {"messageStop": {"stopReason": stop_reason.as_str()}}}),
        serde_json::json!({"event": {"metadata": {
            "usage": usage,
            "metrics": {"latencyMs": latency_ms}
        }}}),
    ]
}

#[async_trait]
impl ModelClient for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn converse(
        &self,
        request: ModelRequest,
        relay: Option<&mpsc::Sender<Value>>,
    ) -> Result<ModelTurn, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model_id,
            "messages": to_api_messages(&request.system_prompt, &request.messages),
            "temperature": request.temperature,
            "top_p": request.top_p,
            "max_tokens": request.max_tokens,
            "stream": false,
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(to_api_tools(&request.tools));
        }

        debug!(model = %request.model_id, "Sending converse round");
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model endpoint returned error");
            return Err(ModelError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| ModelError::Api {
            status_code: 200,
            message: format!("failed to parse response: {e}"),
        })?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Api {
                status_code: 200,
                message: "no choices in response".into(),
            })?;

        let tool_uses: Vec<ToolUse> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolUse {
                id: tc.id,
                name: tc.function.name,
                input: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
            })
            .collect();

        let content = choice.message.content.unwrap_or_default();
        let stop_reason = map_finish_reason(choice.finish_reason.as_deref(), !tool_uses.is_empty());
        let usage = api_response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        if let Some(relay) = relay {
            for event in round_events(&content, stop_reason, &usage, latency_ms) {
                relay
                    .send(event)
                    .await
                    .map_err(|_| ModelError::Interrupted("relay closed".into()))?;
            }
        }

        let mut message = ChatMessage::assistant(content);
        message.tool_uses = tool_uses;

        Ok(ModelTurn {
            message,
            stop_reason,
            usage,
            latency_ms,
        })
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use coppertail_core::event::{EventKind, ResponseEvent};

    #[test]
    fn system_prompt_becomes_first_message() {
        let messages = vec![ChatMessage::user("hello")];
        let api = to_api_messages("be kind", &messages);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[0].content.as_deref(), Some("be kind"));
        assert_eq!(api[1].role, "user");
    }

    #[test]
    fn tool_result_keeps_its_binding() {
        let messages = vec![ChatMessage::tool_result("tooluse_1", "晴れ")];
        let api = to_api_messages("", &messages);
        assert_eq!(api[1].role, "tool");
        assert_eq!(api[1].tool_call_id.as_deref(), Some("tooluse_1"));
    }

    #[test]
    fn assistant_tool_uses_serialize_as_tool_calls() {
        let mut message = ChatMessage::assistant("");
        message.tool_uses.push(ToolUse {
            id: "tooluse_1".into(),
            name: "call_weather_agent".into(),
            input: serde_json::json!({"city": "大阪"}),
        });
        let api = to_api_messages("", &[message]);
        let calls = api[1].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "call_weather_agent");
        assert!(calls[0].function.arguments.contains("大阪"));
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(map_finish_reason(Some("stop"), false), StopReason::EndTurn);
        assert_eq!(
            map_finish_reason(Some("tool_calls"), true),
            StopReason::ToolUse
        );
        assert_eq!(
            map_finish_reason(Some("length"), false),
            StopReason::MaxTokens
        );
        // Some endpoints report "stop" even when tool calls are present.
        assert_eq!(map_finish_reason(Some("stop"), true), StopReason::ToolUse);
    }

    #[test]
    fn round_events_normalize_cleanly() {
        let events = round_events("こんにちは", StopReason::EndTurn, &Usage::new(100, 10), 250);
        assert_eq!(events.len(), 6);

        let normalized: Vec<ResponseEvent> = events
            .iter()
            .map(|e| ResponseEvent::from_raw(e).unwrap())
            .collect();
        assert_eq!(normalized[0].event, EventKind::MessageStart);
        assert_eq!(normalized[2].event, EventKind::ContentBlockDelta);
        assert_eq!(normalized[2].data, "こんにちは");
        assert_eq!(normalized[4].event, EventKind::MessageStop);
        assert_eq!(normalized[4].data, "end_turn");
        assert_eq!(normalized[5].event, EventKind::Metadata);
        assert!(normalized[5].data.contains(r#""latencyMs":250"#));
    }
}
