//! The invocation recorder — best-effort persistence of one record per run.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use coppertail_core::metrics::Usage;
use coppertail_core::session::SessionContext;

use crate::model::InvocationRecord;
use crate::store::LogStore;

/// Writes one `InvocationRecord` per terminal invocation.
///
/// Failures are logged and swallowed: telemetry never fails the
/// user-visible response.
pub struct InvocationRecorder {
    store: Arc<dyn LogStore>,
}

impl InvocationRecorder {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Record a successful run from its consolidated summary.
    pub async fn record_success(
        &self,
        invocation_id: &str,
        context: &SessionContext,
        input: &str,
        output: String,
        usage: Usage,
        latency_ms: u64,
    ) {
        self.put(InvocationRecord {
            invocation_id: invocation_id.to_string(),
            actor_id: context.actor_id.clone(),
            timestamp: Utc::now(),
            session_id: context.session_id.clone(),
            input: input.to_string(),
            output: Some(output),
            usage: Some(usage),
            latency_ms: Some(latency_ms),
        })
        .await;
    }

    /// Record a run that reached a terminal failure. Output and metrics are
    /// absent; cancelled runs never reach this point.
    pub async fn record_failure(
        &self,
        invocation_id: &str,
        context: &SessionContext,
        input: &str,
    ) {
        self.put(InvocationRecord {
            invocation_id: invocation_id.to_string(),
            actor_id: context.actor_id.clone(),
            timestamp: Utc::now(),
            session_id: context.session_id.clone(),
            input: input.to_string(),
            output: None,
            usage: None,
            latency_ms: None,
        })
        .await;
    }

    async fn put(&self, record: InvocationRecord) {
        let invocation_id = record.invocation_id.clone();
        match self.store.put(record).await {
            Ok(()) => debug!(invocation_id = %invocation_id, "Invocation recorded"),
            Err(e) => warn!(
                invocation_id = %invocation_id,
                store = self.store.name(),
                error = %e,
                "Failed to persist invocation record"
            ),
        }
    }
}
