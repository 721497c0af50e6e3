//! LLM provider layer
//!
//! Handles communication with OpenAI-compatible chat-completion backends,
//! both one-shot and streaming.

pub mod backend;
pub mod client;
pub mod sse;
pub mod streaming;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
