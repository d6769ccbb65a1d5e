//! # Coppertail Core
//!
//! Domain types, traits, and error definitions for the coppertail
//! conversational agent runtime. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (model runtime, tools, memory service,
//! durable log store) is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod metrics;
pub mod model;
pub mod result;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{
    Error, MemoryError, ModelError, PersistenceError, Result, SessionBindingError,
    StreamParseError, ToolError,
};
pub use event::{EventKind, RawEvent, ResponseEvent};
pub use memory::{MemoryService, SessionMemory};
pub use message::{ChatMessage, Role, ToolUse};
pub use metrics::{AgentInvocation, CycleMetric, LatencyMetrics, RunMetrics, Usage};
pub use model::{ModelClient, ModelRequest, ModelTurn};
pub use result::{AgentResult, ContentBlock, ResultMessage, StopReason};
pub use session::{InvocationRequest, SessionContext};
pub use tool::{Tool, ToolDefinition, ToolRegistry, ToolResult};
