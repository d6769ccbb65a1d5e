//! The shared model/tool loop.
//!
//! One loop iteration is one model round: converse, account the cycle, then
//! either finish (no tool uses) or execute the requested tools and feed
//! their results back. A failing tool never aborts the loop — the model
//! sees the error as tool-result content and decides what to do. Tool
//! executions are sequential within a round.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use coppertail_config::ModelConfig;
use coppertail_core::error::ModelError;
use coppertail_core::message::ChatMessage;
use coppertail_core::metrics::{CycleMetric, Usage};
use coppertail_core::model::{ModelClient, ModelRequest};
use coppertail_core::result::StopReason;
use coppertail_core::tool::ToolRegistry;

/// Ceiling on model rounds per run, against runaway tool loops.
pub const DEFAULT_MAX_CYCLES: u32 = 10;

/// What one completed loop produced.
pub struct LoopOutcome {
    /// The final assistant message.
    pub message: ChatMessage,
    pub stop_reason: StopReason,
    /// One metric per model round, in order.
    pub cycles: Vec<CycleMetric>,
    /// Usage summed over this loop's own cycles.
    pub usage: Usage,
    /// Latency summed over this loop's own cycles.
    pub latency_ms: u64,
}

/// Run the converse/execute loop to completion.
///
/// Raw envelopes are forwarded through `relay` as the model produces them;
/// sub-agents run with `relay = None` so only the root agent's stream
/// reaches the caller.
pub async fn run_loop(
    model: &dyn ModelClient,
    model_config: &ModelConfig,
    system_prompt: &str,
    mut messages: Vec<ChatMessage>,
    tools: &ToolRegistry,
    relay: Option<&mpsc::Sender<Value>>,
    max_cycles: u32,
) -> Result<LoopOutcome, ModelError> {
    let tool_definitions = tools.definitions();
    let mut cycles: Vec<CycleMetric> = Vec::new();
    let mut usage = Usage::default();
    let mut latency_ms = 0u64;

    loop {
        if cycles.len() as u32 >= max_cycles {
            warn!(
                cycles = cycles.len(),
                "Max tool cycles reached, forcing final response"
            );
            return Ok(LoopOutcome {
                message: ChatMessage::assistant(
                    "I could not finish within the allowed number of tool calls.",
                ),
                stop_reason: StopReason::EndTurn,
                cycles,
                usage,
                latency_ms,
            });
        }

        let request = ModelRequest {
            model_id: model_config.model_id.clone(),
            system_prompt: system_prompt.to_string(),
            messages: messages.clone(),
            tools: tool_definitions.clone(),
            max_tokens: model_config.max_tokens,
            temperature: model_config.temperature,
            top_p: model_config.top_p,
        };

        let turn = model.converse(request, relay).await?;

        cycles.push(CycleMetric {
            cycle_id: Uuid::new_v4().to_string(),
            usage: turn.usage.clone(),
        });
        usage.add(&turn.usage);
        latency_ms += turn.latency_ms;

        if turn.message.tool_uses.is_empty() {
            return Ok(LoopOutcome {
                message: turn.message,
                stop_reason: turn.stop_reason,
                cycles,
                usage,
                latency_ms,
            });
        }

        debug!(
            tool_count = turn.message.tool_uses.len(),
            "Executing requested tool calls"
        );

        let tool_uses = turn.message.tool_uses.clone();
        messages.push(turn.message);

        for tool_use in &tool_uses {
            match tools.execute(&tool_use.name, tool_use.input.clone()).await {
                Ok(result) => {
                    debug!(tool = %tool_use.name, "Tool call succeeded");
                    messages.push(ChatMessage::tool_result(&tool_use.id, &result.output));
                }
                Err(e) => {
                    // Surface the failure to the model instead of aborting.
                    warn!(tool = %tool_use.name, error = %e, "Tool call failed");
                    messages.push(ChatMessage::tool_result(
                        &tool_use.id,
                        format!("Error: {e}"),
                    ));
                }
            }
        }
    }
}
