//! In-memory backend — useful for testing and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use coppertail_core::error::{MemoryError, SessionBindingError};
use coppertail_core::memory::{MemoryService, SessionMemory};
use coppertail_core::message::ChatMessage;
use coppertail_core::session::SessionContext;

type Sessions = Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>;

/// A memory service that keeps every session's history in process memory.
///
/// Each `bind` returns a fresh handle; handles bound to the same identity
/// scope share the underlying session, which is what the external service
/// would provide.
pub struct InMemoryService {
    sessions: Sessions,
}

impl InMemoryService {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn session_key(context: &SessionContext) -> String {
        format!(
            "{}/{}/{}",
            context.memory_id, context.actor_id, context.session_id
        )
    }
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryService for InMemoryService {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn bind(
        &self,
        context: &SessionContext,
    ) -> Result<Box<dyn SessionMemory>, SessionBindingError> {
        Ok(Box::new(InMemoryHandle {
            key: Self::session_key(context),
            sessions: self.sessions.clone(),
        }))
    }
}

struct InMemoryHandle {
    key: String,
    sessions: Sessions,
}

#[async_trait]
impl SessionMemory for InMemoryHandle {
    async fn history(&self) -> Result<Vec<ChatMessage>, MemoryError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&self.key)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, message: &ChatMessage) -> Result<(), MemoryError> {
        self.sessions
            .write()
            .await
            .entry(self.key.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }
}
