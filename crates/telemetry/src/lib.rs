//! Per-invocation telemetry for coppertail.
//!
//! One record per invocation, keyed by actor and timestamp, built from the
//! stream aggregator's consolidated summary. Persistence is best-effort:
//! the user-visible response must succeed even when the log store is down.

pub mod model;
pub mod recorder;
pub mod store;

pub use model::InvocationRecord;
pub use recorder::InvocationRecorder;
pub use store::{InMemoryLogStore, JsonlLogStore, LogStore};
