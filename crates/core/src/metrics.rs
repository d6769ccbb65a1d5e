//! Token usage and latency accounting for a run.
//!
//! The shapes mirror what the model runtime reports: per-cycle usage inside
//! each agent invocation, plus accumulated figures merged across nested
//! sub-agent calls. The accumulated figures are authoritative — they may
//! legitimately exceed the sum of the cycles visible at one layer, because
//! the runtime attributes nested sub-agent usage into them.

use serde::{Deserialize, Serialize};

/// Token counts for one or more model calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    /// Accumulate another measurement into this one.
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Wall-clock milliseconds as attributed by the runtime's own accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyMetrics {
    #[serde(default)]
    pub latency_ms: u64,
}

/// Usage for a single model call round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleMetric {
    pub cycle_id: String,
    pub usage: Usage,
}

/// The metrics of one agent's run: its cycles plus their merged usage.
/// The root agent and every delegated sub-agent each contribute one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentInvocation {
    #[serde(default)]
    pub cycles: Vec<CycleMetric>,
    #[serde(default)]
    pub usage: Usage,
}

/// The full metrics tree of a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Merged usage across the root agent and all nested sub-agents.
    pub accumulated_usage: Usage,
    /// Merged latency across the root agent and all nested sub-agents.
    pub accumulated_metrics: LatencyMetrics,
    /// Per-agent breakdown, in completion order.
    #[serde(default)]
    pub agent_invocations: Vec<AgentInvocation>,
}
