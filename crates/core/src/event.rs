//! The event envelope model — one streamed unit of the model's output.
//!
//! The runtime emits messages shaped `{"event": {"<kind>": {...}}}` where
//! `<kind>` is exactly one of six recognized keys. The envelope is modeled
//! as an exhaustive externally-tagged enum, so an unrecognized shape is a
//! `StreamParseError` rather than a silent lookup miss.
//!
//! Normalization turns every envelope into `{event, data}` where `data` is
//! always a string: the delta's text fragment for `contentBlockDelta` (empty
//! string when the fragment is empty, never absent), the stringified stop
//! reason for `messageStop`, and the JSON serialization of the kind-specific
//! sub-object for everything else.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StreamParseError;
use crate::metrics::{LatencyMetrics, Usage};

/// The six recognized envelope kinds, in stream order of a typical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    MessageStart,
    ContentBlockStart,
    ContentBlockDelta,
    ContentBlockStop,
    MessageStop,
    Metadata,
}

impl EventKind {
    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageStart => "messageStart",
            Self::ContentBlockStart => "contentBlockStart",
            Self::ContentBlockDelta => "contentBlockDelta",
            Self::ContentBlockStop => "contentBlockStop",
            Self::MessageStop => "messageStop",
            Self::Metadata => "metadata",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incremental text fragment for one content block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockDelta {
    #[serde(default)]
    pub delta: TextDelta,
    #[serde(default)]
    pub content_block_index: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextDelta {
    #[serde(default)]
    pub text: Option<String>,
}

/// The terminal marker of a streamed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStop {
    pub stop_reason: String,
}

/// Usage and latency reported at the end of one model call round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamMetadata {
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub metrics: LatencyMetrics,
}

/// A raw envelope, tagged by its single kind key.
///
/// Kinds whose payload the core never inspects stay as raw JSON so the
/// normalized `data` string reproduces them verbatim.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RawEvent {
    MessageStart(Value),
    ContentBlockStart(Value),
    ContentBlockDelta(ContentBlockDelta),
    ContentBlockStop(Value),
    MessageStop(MessageStop),
    Metadata(StreamMetadata),
}

const RECOGNIZED_KINDS: [&str; 6] = [
    "messageStart",
    "contentBlockStart",
    "contentBlockDelta",
    "contentBlockStop",
    "messageStop",
    "metadata",
];

/// One normalized streamed unit: a kind and a string payload.
///
/// Invariant: `data` is always present, even for empty text deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEvent {
    pub event: EventKind,
    pub data: String,
}

impl ResponseEvent {
    /// Classify a raw runtime message into a normalized event.
    ///
    /// Fails closed: a missing envelope or an envelope keyed by anything
    /// other than the six recognized kinds is a `StreamParseError`.
    pub fn from_raw(message: &Value) -> std::result::Result<Self, StreamParseError> {
        let envelope = message
            .get("event")
            .ok_or(StreamParseError::MissingEnvelope)?;

        let kind_key = envelope
            .as_object()
            .and_then(|obj| obj.keys().next())
            .ok_or(StreamParseError::MissingEnvelope)?;
        if !RECOGNIZED_KINDS.contains(&kind_key.as_str()) {
            return Err(StreamParseError::UnrecognizedKind(kind_key.clone()));
        }

        let event: RawEvent = serde_json::from_value(envelope.clone())
            .map_err(|e| StreamParseError::Malformed(e.to_string()))?;
        Self::from_event(&event)
    }

    /// Normalize an already-classified envelope.
    pub fn from_event(event: &RawEvent) -> std::result::Result<Self, StreamParseError> {
        let (kind, data) = match event {
            RawEvent::MessageStart(payload) => {
                (EventKind::MessageStart, serialize_payload(payload)?)
            }
            RawEvent::ContentBlockStart(payload) => {
                (EventKind::ContentBlockStart, serialize_payload(payload)?)
            }
            RawEvent::ContentBlockDelta(delta) => (
                EventKind::ContentBlockDelta,
                delta.delta.text.clone().unwrap_or_default(),
            ),
            RawEvent::ContentBlockStop(payload) => {
                (EventKind::ContentBlockStop, serialize_payload(payload)?)
            }
            RawEvent::MessageStop(stop) => (EventKind::MessageStop, stop.stop_reason.clone()),
            RawEvent::Metadata(metadata) => (EventKind::Metadata, serialize_payload(metadata)?),
        };
        Ok(Self { event: kind, data })
    }
}

fn serialize_payload<T: Serialize>(payload: &T) -> std::result::Result<String, StreamParseError> {
    serde_json::to_string(payload).map_err(|e| StreamParseError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delta_with_text_normalizes_to_fragment() {
        let msg = json!({
            "event": {
                "contentBlockDelta": {"delta": {"text": "大阪"}, "contentBlockIndex": 0}
            }
        });
        let event = ResponseEvent::from_raw(&msg).unwrap();
        assert_eq!(event.event, EventKind::ContentBlockDelta);
        assert_eq!(event.data, "大阪");
    }

    #[test]
    fn empty_delta_normalizes_to_empty_string() {
        let msg = json!({
            "event": {
                "contentBlockDelta": {"delta": {"text": ""}, "contentBlockIndex": 0}
            }
        });
        let event = ResponseEvent::from_raw(&msg).unwrap();
        assert_eq!(event.data, "");
    }

    #[test]
    fn absent_delta_text_normalizes_to_empty_string() {
        let msg = json!({
            "event": {
                "contentBlockDelta": {"delta": {}, "contentBlockIndex": 0}
            }
        });
        let event = ResponseEvent::from_raw(&msg).unwrap();
        assert_eq!(event.data, "");
    }

    #[test]
    fn message_stop_normalizes_to_stop_reason() {
        let msg = json!({"event": {"messageStop": {"stopReason": "end_turn"}}});
        let event = ResponseEvent::from_raw(&msg).unwrap();
        assert_eq!(event.event, EventKind::MessageStop);
        assert_eq!(event.data, "end_turn");
    }

    #[test]
    fn metadata_normalizes_to_serialized_map() {
        let msg = json!({
            "event": {
                "metadata": {
                    "usage": {"inputTokens": 1039, "outputTokens": 41, "totalTokens": 1080},
                    "metrics": {"latencyMs": 739}
                }
            }
        });
        let event = ResponseEvent::from_raw(&msg).unwrap();
        assert_eq!(event.event, EventKind::Metadata);
        assert!(event.data.contains(r#""inputTokens":1039"#));
        assert!(event.data.contains(r#""latencyMs":739"#));
    }

    #[test]
    fn unrecognized_kind_fails_closed() {
        let msg = json!({"event": {"citationsDelta": {"source": "x"}}});
        let err = ResponseEvent::from_raw(&msg).unwrap_err();
        assert!(matches!(
            err,
            StreamParseError::UnrecognizedKind(kind) if kind == "citationsDelta"
        ));
    }

    #[test]
    fn missing_envelope_fails_closed() {
        let msg = json!({"result": "done"});
        let err = ResponseEvent::from_raw(&msg).unwrap_err();
        assert!(matches!(err, StreamParseError::MissingEnvelope));
    }

    /// The full twelve-envelope sequence of one streamed answer: every kind
    /// appears, one delta is empty, several carry Japanese fragments.
    #[test]
    fn full_stream_sequence_normalizes() {
        let delta = |text: &str| {
            json!({"event": {"contentBlockDelta": {"delta": {"text": text}, "contentBlockIndex": 0}}})
        };
        let messages = vec![
            json!({"event": {"messageStart": {"role": "assistant"}}}),
            delta(""),
            delta("大阪"),
            delta("の"),
            delta("現在の"),
            delta("天"),
            delta("気"),
            delta("は"),
            delta("曇りで"),
            json!({"event": {"contentBlockStop": {"contentBlockIndex": 0}}}),
            json!({"event": {"messageStop": {"stopReason": "end_turn"}}}),
            json!({"event": {"metadata": {
                "usage": {"inputTokens": 1039, "outputTokens": 41, "totalTokens": 1080},
                "metrics": {"latencyMs": 739}
            }}}),
        ];
        assert_eq!(messages.len(), 12);

        for msg in &messages {
            let event = ResponseEvent::from_raw(msg).unwrap();
            // Every normalized event has a kind and a string payload.
            assert!(!event.event.as_str().is_empty());
            let _: &String = &event.data;
        }
    }

    #[test]
    fn normalized_event_serializes_with_wire_kind_names() {
        let event = ResponseEvent {
            event: EventKind::ContentBlockDelta,
            data: "天気".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"contentBlockDelta""#));
        assert!(json.contains(r#""data":"天気""#));
    }
}
