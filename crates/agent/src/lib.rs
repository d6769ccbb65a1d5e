//! The coppertail agent layer: tool dispatch and stream aggregation.
//!
//! A request flows session binder → tool router → stream aggregator. The
//! router runs the model loop and executes requested tool calls, each of
//! which delegates to a bounded sub-agent; the aggregator normalizes the
//! raw event stream for the caller and consolidates the terminal result
//! into the summary the recorder persists.

pub mod aggregator;
pub mod event_loop;
pub mod registry;
pub mod router;
pub mod service;
pub mod sink;
pub mod sub_agent;

pub use aggregator::{consolidate, RunSummary};
pub use registry::{standard_registry, SubAgentToolset};
pub use router::ToolRouter;
pub use service::{AgentService, InvocationStream};
pub use sink::MetricsSink;
pub use sub_agent::{SubAgent, SubAgentTool};
