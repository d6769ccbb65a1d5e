//! Session binding and memory backends for coppertail.
//!
//! The session binder derives the identity scope of an invocation and
//! constructs an isolated memory handle for it through the external
//! `MemoryService`. The in-memory backend exists for tests and local runs.

pub mod binder;
pub mod in_memory;

pub use binder::{BoundSession, SessionBinder};
pub use in_memory::InMemoryService;
