//! Conversation message types.
//!
//! These flow between the tool router and the model runtime: user input,
//! assistant replies (possibly requesting tool uses), and tool results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The role of a message sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A single message in the conversation the router maintains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,

    /// The text content.
    pub content: String,

    /// Tool uses requested by the assistant (if any).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_uses: Vec<ToolUse>,

    /// If this is a tool result, which tool use it responds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_uses: Vec::new(),
            tool_use_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_uses: Vec::new(),
            tool_use_id: None,
        }
    }

    /// A tool result bound to the tool use it answers.
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_uses: Vec::new(),
            tool_use_id: Some(tool_use_id.into()),
        }
    }
}

/// A tool use requested by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_carries_binding() {
        let msg = ChatMessage::tool_result("tooluse_1", "晴れ、気温25度");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_use_id.as_deref(), Some("tooluse_1"));
    }

    #[test]
    fn serialization_roundtrip() {
        let mut msg = ChatMessage::assistant("checking the weather");
        msg.tool_uses.push(ToolUse {
            id: "tooluse_1".into(),
            name: "call_weather_agent".into(),
            input: serde_json::json!({"city": "大阪"}),
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tool_uses.len(), 1);
        assert_eq!(back.tool_uses[0].name, "call_weather_agent");
    }
}
