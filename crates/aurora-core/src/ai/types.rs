//! Core types shared across the AI layer and the agent pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation. Immutable once sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-request user context. Read-only through the pipeline; the core does
/// not persist it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub messages: Vec<ChatMessage>,
    pub user_id: String,
    pub session_id: String,
}

impl UserContext {
    /// Context with no session identity attached.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            user_id: String::new(),
            session_id: String::new(),
        }
    }

    /// The most recent user turn, if any. Stages render it into their
    /// prompts.
    pub fn last_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Typed result of the intent-analysis stage, consumed by every downstream
/// stage as context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub intent: String,
    pub confidence: f64,
    pub entities: BTreeMap<String, Value>,
}

impl IntentAnalysis {
    /// Build from a parsed stage payload, applying the producer-side
    /// defaults: missing intent becomes "未知意图", missing confidence
    /// becomes 0.0, and confidence is clamped to [0, 1].
    pub fn from_value(value: &Value) -> Self {
        let intent = value
            .get("intent")
            .and_then(|v| v.as_str())
            .unwrap_or("未知意图")
            .to_string();

        let confidence = value
            .get("confidence")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);

        let entities = value
            .get("entities")
            .and_then(|v| v.as_object())
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Self {
            intent,
            confidence,
            entities,
        }
    }

    /// Whether the intent entities flag this consultation as work-method
    /// related. Accepts a boolean or the strings "true"/"false" since LLM
    /// output is loose about types.
    pub fn is_work_method(&self) -> bool {
        match self.entities.get("is_work_method") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}
