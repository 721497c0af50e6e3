//! Simple (non-streaming) API calls
//!
//! Failures never surface as `Err`: transport errors, non-success statuses
//! and unparseable bodies are all folded into an error envelope so the agent
//! layer can fall back without aborting the pipeline.

use serde_json::Value;
use tracing::{debug, warn};

use super::{error_envelope, error_envelope_with_status, CallOptions, LlmClient};
use crate::ai::types::ChatMessage;

impl LlmClient {
    /// Make a non-streaming chat-completion call.
    ///
    /// Returns the raw response body on success, or an error envelope
    /// (`{"error": {...}}`) on any failure.
    pub async fn call_simple(&self, messages: &[ChatMessage], options: &CallOptions) -> Value {
        let body = self.build_body(messages, options, false);
        let url = self.config().api_url();
        debug!("calling {} with {} messages", url, messages.len());

        let response = match self.build_request(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("LLM request timed out: {}", e);
                return error_envelope("timeout_error", format!("request timed out: {}", e));
            }
            Err(e) => {
                warn!("LLM request failed: {}", e);
                return error_envelope("connection_error", format!("request failed: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("LLM returned HTTP {}: {}", status, text);
            let details = serde_json::from_str::<Value>(&text).ok();
            return error_envelope_with_status(
                "api_error",
                format!("HTTP {}", status.as_u16()),
                status.as_u16(),
                details,
            );
        }

        match response.json::<Value>().await {
            Ok(json) => json,
            Err(e) => {
                warn!("LLM response body was not JSON: {}", e);
                error_envelope("decode_error", format!("invalid response body: {}", e))
            }
        }
    }
}
