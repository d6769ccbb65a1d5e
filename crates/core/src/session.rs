//! Invocation request and session identity types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The request payload for one invocation.
///
/// `actor_id` and `session_id` are optional: each missing field defaults to
/// the generated invocation id independently, so an anonymous invocation
/// gets its own isolated actor and session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// The user's input text. An empty string is accepted and treated as a
    /// no-op prompt.
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl InvocationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            actor_id: None,
            session_id: None,
        }
    }
}

/// Generate a fresh opaque invocation identifier.
pub fn new_invocation_id() -> String {
    Uuid::new_v4().to_string()
}

/// The identity scope one invocation's memory handle is bound to.
///
/// Owned by the session binder; the tool router reads it for the duration of
/// the invocation. Never persisted here — conversation persistence is the
/// external memory service's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub memory_id: String,
    pub session_id: String,
    pub actor_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_without_identities() {
        let req: InvocationRequest =
            serde_json::from_str(r#"{"prompt": "大阪の天気は？"}"#).unwrap();
        assert_eq!(req.prompt, "大阪の天気は？");
        assert!(req.actor_id.is_none());
        assert!(req.session_id.is_none());
    }

    #[test]
    fn invocation_ids_are_unique() {
        assert_ne!(new_invocation_id(), new_invocation_id());
    }
}
