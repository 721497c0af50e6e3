//! Completion backend abstraction.
//!
//! The pipeline consumes chat completion as an external capability. The one
//! production implementation is [`LlmClient`](super::client::LlmClient);
//! tests substitute a scripted in-memory backend.

use anyhow::Result;
use serde_json::Value;
use tokio::sync::mpsc;

use super::client::CallOptions;
use super::streaming::StreamPart;
use super::types::ChatMessage;

/// An LLM chat-completion backend.
///
/// `complete` returns the raw provider envelope. An `{"error": ...}` object
/// is a valid `Ok` value — the backend converts transport and HTTP failures
/// into error envelopes so callers handle exactly one failure shape. The
/// stage layer is responsible for inspecting the envelope.
///
/// Implementations must be safe for concurrent use by independent requests;
/// the backend is the only resource shared across pipeline runs.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One-shot completion; resolves to the full response envelope.
    async fn complete(&self, messages: Vec<ChatMessage>, options: &CallOptions) -> Result<Value>;

    /// Streaming completion; yields incremental text fragments. The channel
    /// closing signals end-of-stream.
    async fn complete_stream(
        &self,
        messages: Vec<ChatMessage>,
        options: &CallOptions,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>>;
}

#[async_trait::async_trait]
impl CompletionBackend for super::client::LlmClient {
    async fn complete(&self, messages: Vec<ChatMessage>, options: &CallOptions) -> Result<Value> {
        Ok(self.call_simple(&messages, options).await)
    }

    async fn complete_stream(
        &self,
        messages: Vec<ChatMessage>,
        options: &CallOptions,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>> {
        self.call_streaming(&messages, options).await
    }
}
