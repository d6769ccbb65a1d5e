//! Sub-agents and the tool adapters that expose them to the root agent.
//!
//! A sub-agent is a bounded agent: a narrow system prompt, its own small
//! tool set, and a fresh conversation per delegation. Its metrics are
//! reported into the shared sink so the invocation's accumulated figures
//! cover nested runs.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use coppertail_config::ModelConfig;
use coppertail_core::error::{ModelError, ToolError};
use coppertail_core::message::ChatMessage;
use coppertail_core::metrics::AgentInvocation;
use coppertail_core::model::ModelClient;
use coppertail_core::tool::{Tool, ToolRegistry, ToolResult};

use crate::event_loop::{run_loop, DEFAULT_MAX_CYCLES};
use crate::sink::MetricsSink;

/// A narrowly scoped agent bound to one concern.
pub struct SubAgent {
    name: String,
    system_prompt: String,
    tools: ToolRegistry,
    model: Arc<dyn ModelClient>,
    model_config: ModelConfig,
    sink: MetricsSink,
    max_cycles: u32,
}

impl SubAgent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        tools: Vec<Box<dyn Tool>>,
        model: Arc<dyn ModelClient>,
        model_config: ModelConfig,
        sink: MetricsSink,
    ) -> Self {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            tools: registry,
            model,
            model_config,
            sink,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the sub-agent on one delegated prompt and return its final text.
    ///
    /// Each run starts a fresh conversation; sub-agents carry no history of
    /// their own. Events are not relayed — only the root agent streams.
    pub async fn run(&self, prompt: &str) -> Result<String, ModelError> {
        let outcome = run_loop(
            self.model.as_ref(),
            &self.model_config,
            &self.system_prompt,
            vec![ChatMessage::user(prompt)],
            &self.tools,
            None,
            self.max_cycles,
        )
        .await?;

        self.sink.record(
            AgentInvocation {
                cycles: outcome.cycles,
                usage: outcome.usage,
            },
            outcome.latency_ms,
        );

        Ok(outcome.message.content)
    }
}

/// The tool-function adapter the root agent dispatches to.
///
/// Accepts one string argument, renders the delegation prompt, and returns
/// the sub-agent's answer unchanged as tool output. No retry on failure.
pub struct SubAgentTool {
    name: String,
    description: String,
    arg_name: String,
    arg_description: String,
    /// Delegation prompt with `{}` standing for the argument value.
    prompt_template: String,
    agent: SubAgent,
}

impl SubAgentTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        arg_name: impl Into<String>,
        arg_description: impl Into<String>,
        prompt_template: impl Into<String>,
        agent: SubAgent,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arg_name: arg_name.into(),
            arg_description: arg_description.into(),
            prompt_template: prompt_template.into(),
            agent,
        }
    }
}

#[async_trait]
impl Tool for SubAgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        properties.insert(
            self.arg_name.clone(),
            serde_json::json!({
                "type": "string",
                "description": self.arg_description,
            }),
        );
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": [self.arg_name]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let value = arguments[&self.arg_name].as_str().ok_or_else(|| {
            ToolError::InvalidArguments(format!("Missing '{}' argument", self.arg_name))
        })?;

        let prompt = self.prompt_template.replacen("{}", value, 1);
        info!(tool = %self.name, agent = %self.agent.name(), argument = value, "Delegating to sub-agent");

        match self.agent.run(&prompt).await {
            Ok(answer) => {
                info!(tool = %self.name, "Sub-agent completed");
                Ok(ToolResult::text(answer))
            }
            Err(e) => {
                warn!(tool = %self.name, error = %e, "Sub-agent failed");
                Err(ToolError::ExecutionFailed {
                    tool_name: self.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
