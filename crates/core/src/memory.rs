//! Memory service trait — session-scoped conversational history.
//!
//! The memory service is an external collaborator. `bind` constructs a
//! handle scoped to `(memory_id, session_id, actor_id)`; the handle is
//! exclusively owned by one invocation and never reused concurrently, even
//! for the same session id. Consistency across concurrent writers to the
//! same session is the external service's responsibility.

use async_trait::async_trait;

use crate::error::{MemoryError, SessionBindingError};
use crate::message::ChatMessage;
use crate::session::SessionContext;

/// The external memory service.
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// The service name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Construct a fresh handle bound to the given identity scope.
    ///
    /// Errors on misconfiguration — the invocation must fail fast rather
    /// than silently run memory-less.
    async fn bind(
        &self,
        context: &SessionContext,
    ) -> std::result::Result<Box<dyn SessionMemory>, SessionBindingError>;
}

/// A session-scoped handle to conversational history.
#[async_trait]
pub trait SessionMemory: Send + Sync {
    /// Load the conversation so far, oldest first.
    async fn history(&self) -> std::result::Result<Vec<ChatMessage>, MemoryError>;

    /// Append one message to the conversation.
    async fn append(&self, message: &ChatMessage) -> std::result::Result<(), MemoryError>;
}
