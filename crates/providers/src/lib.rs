//! Model runtime bindings for coppertail.
//!
//! The agent layer talks to the model through the `ModelClient` trait;
//! this crate provides the OpenAI-compatible HTTP binding used by the
//! binaries. Anything speaking the `/chat/completions` protocol works.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatModel;
