//! The persisted invocation record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coppertail_core::metrics::Usage;

/// One persisted row per invocation.
///
/// `actor_id` is the partition key and `timestamp` the sort key (RFC 3339
/// strings sort chronologically). Written once at terminal state — success
/// or recorded failure — and never mutated. Cancelled runs write nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub invocation_id: String,
    pub actor_id: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,

    /// The prompt as received.
    pub input: String,

    /// The consolidated output message; absent for a recorded failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Accumulated usage; absent when the run produced no metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Accumulated latency; absent when the run produced no metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}
