//! The session binder — identity derivation and memory handle construction.
//!
//! For each invocation: extract `actor_id` and `session_id` from the request
//! payload, substituting the invocation id for each missing field
//! independently, then bind a fresh memory handle scoped to
//! `(memory_id, session_id, actor_id)`.
//!
//! The binder fails fast when the memory identifier is not configured.
//! Running without memory would look fine locally and then bleed
//! conversation state across sessions on some runtime configurations, so
//! that fallback is an error here, not a default.

use std::sync::Arc;
use tracing::debug;

use coppertail_core::error::SessionBindingError;
use coppertail_core::memory::{MemoryService, SessionMemory};
use coppertail_core::session::{InvocationRequest, SessionContext};

/// One invocation's bound session: its identity scope and its exclusive
/// memory handle.
pub struct BoundSession {
    pub context: SessionContext,
    pub memory: Box<dyn SessionMemory>,
}

/// Builds session contexts and memory handles for invocations.
pub struct SessionBinder {
    memory_id: String,
    service: Arc<dyn MemoryService>,
}

impl std::fmt::Debug for SessionBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBinder")
            .field("memory_id", &self.memory_id)
            .finish_non_exhaustive()
    }
}

impl SessionBinder {
    /// Create a binder for the configured memory store.
    ///
    /// `memory_id` comes from configuration; `None` is a
    /// `SessionBindingError` so misconfiguration surfaces before any run.
    pub fn new(
        memory_id: Option<String>,
        service: Arc<dyn MemoryService>,
    ) -> Result<Self, SessionBindingError> {
        let memory_id = memory_id.ok_or(SessionBindingError::MissingMemoryId)?;
        Ok(Self { memory_id, service })
    }

    /// Bind a session for one invocation.
    ///
    /// Each missing identity field defaults to the invocation id on its
    /// own, so an anonymous invocation gets an actor and session isolated
    /// from every other invocation.
    pub async fn bind(
        &self,
        request: &InvocationRequest,
        invocation_id: &str,
    ) -> Result<BoundSession, SessionBindingError> {
        let context = SessionContext {
            memory_id: self.memory_id.clone(),
            actor_id: request
                .actor_id
                .clone()
                .unwrap_or_else(|| invocation_id.to_string()),
            session_id: request
                .session_id
                .clone()
                .unwrap_or_else(|| invocation_id.to_string()),
        };

        debug!(
            actor_id = %context.actor_id,
            session_id = %context.session_id,
            "Binding session memory"
        );

        let memory = self.service.bind(&context).await?;
        Ok(BoundSession { context, memory })
    }
}
