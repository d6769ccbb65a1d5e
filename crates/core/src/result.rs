//! The terminal result of one completed run.
//!
//! Produced once by the tool router after its loop finishes. Owned by the
//! router for the duration of the invocation; the aggregator and the
//! recorder only read it.

use serde::{Deserialize, Serialize};

use crate::metrics::RunMetrics;

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    GuardrailIntervened,
    ContentFiltered,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndTurn => "end_turn",
            Self::ToolUse => "tool_use",
            Self::MaxTokens => "max_tokens",
            Self::StopSequence => "stop_sequence",
            Self::GuardrailIntervened => "guardrail_intervened",
            Self::ContentFiltered => "content_filtered",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One block of the final message's content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub text: String,
}

/// The final message: a role plus ordered content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl ResultMessage {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: vec![ContentBlock { text: text.into() }],
        }
    }
}

/// Everything a completed run produced: stop reason, final message, and the
/// merged metrics tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub stop_reason: StopReason,
    pub message: ResultMessage,
    pub metrics: RunMetrics,
}
