//! LLM client configuration
//!
//! Backend-agnostic configuration for the chat-completion client.

use std::time::Duration;

use crate::constants;

/// Configuration for the LLM client.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Deployment/model name, interpolated into the endpoint path.
    pub model: String,
    /// Base URL of the OpenAI-compatible gateway.
    pub api_base: String,
    /// API key, sent as the `api-key` header.
    pub api_key: String,
    /// API version, sent as the `api-version` query parameter.
    pub api_version: String,
    /// Total request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
}

impl LlmClientConfig {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: constants::llm::DEFAULT_MODEL.to_string(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            api_version: constants::llm::DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(constants::llm::REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(constants::llm::CONNECT_TIMEOUT_SECS),
        }
    }

    /// Read configuration from `LLM_API_BASE`, `LLM_API_KEY`, `LLM_MODEL`
    /// and `LLM_API_VERSION`; unset variables fall back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::new(
            std::env::var("LLM_API_BASE").unwrap_or_default(),
            std::env::var("LLM_API_KEY").unwrap_or_default(),
        );
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.model = model;
        }
        if let Ok(version) = std::env::var("LLM_API_VERSION") {
            config.api_version = version;
        }
        config
    }

    /// Full chat-completions endpoint URL.
    pub fn api_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

/// Call options for completion requests.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl CallOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: None,
        }
    }
}
