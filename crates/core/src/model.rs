//! ModelClient trait — the abstraction over the model runtime.
//!
//! One `converse` call is one model round: the client streams raw event
//! envelopes through the optional relay channel as they arrive, then
//! resolves to the round's outcome (the assistant message, any requested
//! tool uses, the stop reason, and the runtime-reported usage and latency).
//!
//! The relay channel is bounded: the producer suspends on each envelope
//! until the consumer has taken it, so events reach the caller in exactly
//! the order they were produced, with no internal buffering.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::ModelError;
use crate::message::ChatMessage;
use crate::metrics::Usage;
use crate::result::StopReason;
use crate::tool::ToolDefinition;

/// A request for one model round.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model_id: String,
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// The outcome of one model round.
#[derive(Debug, Clone)]
pub struct ModelTurn {
    /// The assistant message, including any requested tool uses.
    pub message: ChatMessage,
    pub stop_reason: StopReason,
    /// Usage for this round as reported by the runtime.
    pub usage: Usage,
    /// Latency for this round as attributed by the runtime.
    pub latency_ms: u64,
}

/// The core model runtime trait.
///
/// Tool selection reasoning lives behind this seam — the router only
/// declares the tool surface and executes what the model asks for.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this client.
    fn name(&self) -> &str;

    /// Run one model round, relaying raw envelopes if a channel is given.
    async fn converse(
        &self,
        request: ModelRequest,
        relay: Option<&mpsc::Sender<Value>>,
    ) -> std::result::Result<ModelTurn, ModelError>;
}
