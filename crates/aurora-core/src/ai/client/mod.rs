//! HTTP client for OpenAI-compatible chat-completion gateways
//!
//! Split by concern: `config` holds connection settings, `simple` makes
//! one-shot calls, `streaming` handles SSE streams.

mod config;
mod simple;
mod streaming;

pub use config::{CallOptions, LlmClientConfig};

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::ai::types::ChatMessage;

/// Client for a single chat-completion deployment.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmClientConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    /// POST request with auth header and api-version query attached.
    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .query(&[("api-version", self.config.api_version.as_str())])
    }

    fn build_body(
        &self,
        messages: &[ChatMessage],
        options: &CallOptions,
        streaming: bool,
    ) -> Value {
        let mut body = json!({
            "messages": messages,
            "temperature": options
                .temperature
                .unwrap_or(crate::constants::llm::DEFAULT_TEMPERATURE),
            "stream": streaming,
        });
        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

/// Build an error envelope in the shape upstream gateways use, so callers
/// can treat local failures and remote failures uniformly.
pub(crate) fn error_envelope(kind: &str, message: impl Into<String>) -> Value {
    json!({
        "error": {
            "type": kind,
            "message": message.into(),
        }
    })
}

pub(crate) fn error_envelope_with_status(
    kind: &str,
    message: impl Into<String>,
    status: u16,
    details: Option<Value>,
) -> Value {
    let mut envelope = error_envelope(kind, message);
    envelope["error"]["status_code"] = json!(status);
    if let Some(details) = details {
        envelope["error"]["details"] = details;
    }
    envelope
}
