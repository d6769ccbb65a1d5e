//! Metrics sink — merges usage and latency across nested agent runs.
//!
//! The root router and every sub-agent it delegates to record one
//! `AgentInvocation` each as they complete. The accumulated figures
//! therefore cover nested calls the root's own cycles never see, which is
//! why the accumulated usage can exceed the sum of any one layer's cycles.

use std::sync::{Arc, Mutex};

use coppertail_core::metrics::{AgentInvocation, LatencyMetrics, RunMetrics, Usage};

#[derive(Default)]
struct SinkInner {
    invocations: Vec<AgentInvocation>,
    usage: Usage,
    latency_ms: u64,
}

/// Shared collector for one invocation's metrics tree.
#[derive(Clone, Default)]
pub struct MetricsSink {
    inner: Arc<Mutex<SinkInner>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed agent run.
    pub fn record(&self, invocation: AgentInvocation, latency_ms: u64) {
        let mut inner = self.inner.lock().expect("metrics sink poisoned");
        inner.usage.add(&invocation.usage);
        inner.latency_ms += latency_ms;
        inner.invocations.push(invocation);
    }

    /// The merged metrics tree recorded so far.
    pub fn metrics(&self) -> RunMetrics {
        let inner = self.inner.lock().expect("metrics sink poisoned");
        RunMetrics {
            accumulated_usage: inner.usage.clone(),
            accumulated_metrics: LatencyMetrics {
                latency_ms: inner.latency_ms,
            },
            agent_invocations: inner.invocations.clone(),
        }
    }
}
