//! Application-wide constants

/// LLM backend defaults.
pub mod llm {
    /// Default deployment/model name for the chat-completion backend.
    pub const DEFAULT_MODEL: &str = "deepseek-v3";

    /// Default API version query parameter.
    pub const DEFAULT_API_VERSION: &str = "2024-03-18";

    /// Total request timeout in seconds.
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;

    /// Connect timeout in seconds.
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;

    /// Default sampling temperature when the caller does not set one.
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
}
