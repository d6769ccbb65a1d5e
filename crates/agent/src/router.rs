//! The tool router — the root orchestration agent.
//!
//! Holds the explicit tool registry for one invocation, runs the model
//! loop against the session's history, and assembles the terminal
//! `AgentResult`. Which tools run per turn (zero, one, or many) is the
//! model's decision; the router only declares the surface and routes.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use coppertail_config::ModelConfig;
use coppertail_core::error::ModelError;
use coppertail_core::memory::SessionMemory;
use coppertail_core::message::ChatMessage;
use coppertail_core::metrics::AgentInvocation;
use coppertail_core::model::ModelClient;
use coppertail_core::result::{AgentResult, ContentBlock, ResultMessage};
use coppertail_core::tool::ToolRegistry;

use crate::event_loop::{run_loop, DEFAULT_MAX_CYCLES};
use crate::sink::MetricsSink;

const ROUTER_PROMPT: &str = "You are a kind AI assistant. Please answer user \
    questions politely. If weather information is needed, use call_weather_agent. \
    If web search is needed, use call_search_agent. For news items, use \
    call_news_feed_agent. For questions covered by the internal knowledge base, \
    use call_knowledge_base_agent. For cloud resource questions, use \
    call_cloud_guidance_agent. Answer in the language used by the user.";

/// The root agent for one invocation.
pub struct ToolRouter {
    model: Arc<dyn ModelClient>,
    model_config: ModelConfig,
    tools: ToolRegistry,
    sink: MetricsSink,
    system_prompt: String,
    max_cycles: u32,
}

impl ToolRouter {
    /// Build a router over an explicit tool registry.
    pub fn new(
        model: Arc<dyn ModelClient>,
        model_config: ModelConfig,
        tools: ToolRegistry,
        sink: MetricsSink,
    ) -> Self {
        Self {
            model,
            model_config,
            tools,
            sink,
            system_prompt: ROUTER_PROMPT.into(),
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Run one invocation to completion, relaying raw events as they come.
    ///
    /// History flows through the session memory handle, which this router
    /// owns exclusively for the invocation. Memory failures degrade: a
    /// history load error means an empty context, an append error is
    /// logged, and the run continues either way.
    pub async fn run(
        &self,
        prompt: &str,
        memory: &dyn SessionMemory,
        relay: mpsc::Sender<Value>,
    ) -> Result<AgentResult, ModelError> {
        let mut messages = match memory.history().await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "Failed to load session history, starting empty");
                Vec::new()
            }
        };

        let user_message = ChatMessage::user(prompt);
        if let Err(e) = memory.append(&user_message).await {
            warn!(error = %e, "Failed to persist user message");
        }
        messages.push(user_message);

        info!(
            history_len = messages.len() - 1,
            tools = self.tools.names().len(),
            "Router run starting"
        );

        let outcome = run_loop(
            self.model.as_ref(),
            &self.model_config,
            &self.system_prompt,
            messages,
            &self.tools,
            Some(&relay),
            self.max_cycles,
        )
        .await?;

        if let Err(e) = memory.append(&outcome.message).await {
            warn!(error = %e, "Failed to persist assistant message");
        }

        self.sink.record(
            AgentInvocation {
                cycles: outcome.cycles,
                usage: outcome.usage,
            },
            outcome.latency_ms,
        );

        Ok(AgentResult {
            stop_reason: outcome.stop_reason,
            message: ResultMessage {
                role: "assistant".into(),
                content: vec![ContentBlock {
                    text: outcome.message.content,
                }],
            },
            metrics: self.sink.metrics(),
        })
    }
}
