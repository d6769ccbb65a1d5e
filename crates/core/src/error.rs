//! Error types for the coppertail domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! has its own error type; the top-level `Error` wraps them all.
//!
//! Propagation policy: only `StreamParseError` and `SessionBindingError` may
//! fail a whole invocation. Tool failures are surfaced to the model as
//! tool-result content, and persistence failures are logged and suppressed.

use thiserror::Error;

/// The top-level error type for all coppertail operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Stream normalization errors (fatal, abort the invocation) ---
    #[error("Stream error: {0}")]
    Stream(#[from] StreamParseError),

    // --- Session binding errors (fatal, pre-run) ---
    #[error("Session error: {0}")]
    Session(#[from] SessionBindingError),

    // --- Model runtime errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Tool errors (caught at the tool boundary) ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Memory errors (degrade gracefully mid-run) ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Persistence errors (logged, never surfaced to the caller) ---
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A raw streamed envelope could not be normalized.
///
/// These fail closed: an unrecognized envelope aborts the invocation rather
/// than being silently dropped, so the caller never sees a half-normalized
/// stream.
#[derive(Debug, Clone, Error)]
pub enum StreamParseError {
    #[error("unrecognized event kind: {0}")]
    UnrecognizedKind(String),

    #[error("message carries no event envelope")]
    MissingEnvelope,

    #[error("malformed event envelope: {0}")]
    Malformed(String),
}

/// The session-scoped memory context could not be constructed.
///
/// Fatal before the run starts: running memory-less would silently bleed
/// conversation state across sessions in some runtime configurations.
#[derive(Debug, Clone, Error)]
pub enum SessionBindingError {
    #[error("memory identifier is not configured")]
    MissingMemoryId,

    #[error("memory binding failed: {0}")]
    Bind(String),
}

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("model request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("model stream interrupted: {0}")]
    Interrupted(String),

    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("log store put failed: {0}")]
    Store(String),
}
