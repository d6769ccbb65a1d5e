//! The stream aggregator: live relay normalization and terminal
//! consolidation.
//!
//! Both halves read the same two inputs — the raw event stream and the
//! terminal result — and must stay consistent. The relay is a pass-through
//! transform done per event by `ResponseEvent::from_raw` (no look-ahead,
//! no buffering); consolidation is the pure function below, callable on
//! its own, which is what the recorder and the tests use.

use coppertail_core::event::ResponseEvent;
use coppertail_core::metrics::Usage;
use coppertail_core::result::AgentResult;

/// The consolidated summary of one completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total_usage: Usage,
    pub total_latency_ms: u64,
    pub output_message: String,
}

/// Consolidate a terminal result.
///
/// `total_usage` is the runtime-accumulated figure verbatim — never
/// recomputed from the per-cycle breakdown, which may legitimately sum to
/// less than the accumulated figure once nested sub-agent attribution is
/// involved. `output_message` is the text of content block 0; a message
/// with no content blocks consolidates to an empty string, which is a
/// valid (if unusual) outcome rather than an error.
pub fn consolidate(result: &AgentResult) -> RunSummary {
    RunSummary {
        total_usage: result.metrics.accumulated_usage.clone(),
        total_latency_ms: result.metrics.accumulated_metrics.latency_ms,
        output_message: result
            .message
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default(),
    }
}

/// Normalize one raw message for the live relay.
///
/// Thin alias over the envelope constructor so both aggregator halves are
/// reachable from this module.
pub fn normalize(
    raw: &serde_json::Value,
) -> Result<ResponseEvent, coppertail_core::error::StreamParseError> {
    ResponseEvent::from_raw(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coppertail_core::metrics::{
        AgentInvocation, CycleMetric, LatencyMetrics, RunMetrics,
    };
    use coppertail_core::result::{ContentBlock, ResultMessage, StopReason};

    fn weather_result() -> AgentResult {
        AgentResult {
            stop_reason: StopReason::EndTurn,
            message: ResultMessage::assistant(
                "大阪の現在の天気は曇りで、気温は22度です。現在の時刻は2026年2月23日8時46分です。",
            ),
            metrics: RunMetrics {
                accumulated_usage: Usage {
                    input_tokens: 1959,
                    output_tokens: 91,
                    total_tokens: 2050,
                },
                accumulated_metrics: LatencyMetrics { latency_ms: 1566 },
                agent_invocations: vec![AgentInvocation {
                    cycles: vec![
                        CycleMetric {
                            cycle_id: "a405d3ae-8e5c-4e87-8a4e-c083ea7ea38e".into(),
                            usage: Usage::new(920, 50),
                        },
                        CycleMetric {
                            cycle_id: "5342a1da-6232-4c9c-8969-f80eaa65b314".into(),
                            usage: Usage::new(1039, 41),
                        },
                    ],
                    usage: Usage::new(1959, 91),
                }],
            },
        }
    }

    #[test]
    fn consolidates_weather_run() {
        let summary = consolidate(&weather_result());
        assert_eq!(
            summary.total_usage,
            Usage {
                input_tokens: 1959,
                output_tokens: 91,
                total_tokens: 2050,
            }
        );
        assert_eq!(summary.total_latency_ms, 1566);
        assert_eq!(
            summary.output_message,
            "大阪の現在の天気は曇りで、気温は22度です。現在の時刻は2026年2月23日8時46分です。"
        );
    }

    #[test]
    fn accumulated_usage_is_taken_verbatim() {
        // The accumulated figure intentionally exceeds the cycle sum here;
        // it must be preserved, not reconciled.
        let mut result = weather_result();
        result.metrics.accumulated_usage = Usage {
            input_tokens: 2100,
            output_tokens: 100,
            total_tokens: 2200,
        };
        let summary = consolidate(&result);
        assert_eq!(summary.total_usage.total_tokens, 2200);
    }

    #[test]
    fn empty_content_consolidates_to_empty_string() {
        let mut result = weather_result();
        result.message.content.clear();
        let summary = consolidate(&result);
        assert_eq!(summary.output_message, "");
    }

    #[test]
    fn missing_metrics_consolidate_to_zero_latency() {
        let mut result = weather_result();
        result.metrics = RunMetrics::default();
        let summary = consolidate(&result);
        assert_eq!(summary.total_latency_ms, 0);
        assert_eq!(summary.total_usage, Usage::default());
    }

    #[test]
    fn only_the_first_content_block_is_reported() {
        let mut result = weather_result();
        result.message.content = vec![
            ContentBlock {
                text: "first".into(),
            },
            ContentBlock {
                text: "second".into(),
            },
        ];
        assert_eq!(consolidate(&result).output_message, "first");
    }
}
