//! Stage-level failure taxonomy.

use thiserror::Error;

use super::extract::ExtractionFailure;

/// Why a stage could not produce a schema-valid result.
///
/// Every variant is recoverable: the stage substitutes its fallback payload
/// and the pipeline keeps going.
#[derive(Debug, Error)]
pub enum StageError {
    /// The backend returned an error envelope instead of a completion.
    #[error("backend error: {0}")]
    Backend(String),

    /// The completion envelope did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// The completion text was not valid JSON.
    #[error("invalid JSON in completion: {0}")]
    Parse(#[source] serde_json::Error),

    /// The stream ended without a usable object.
    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),

    /// A complete object was missing a required field.
    #[error("missing required field `{0}`")]
    Schema(String),

    /// A downstream stage was invoked without its required upstream result.
    #[error("stage `{0}` produced no result for its dependents")]
    MissingDependency(&'static str),
}

impl StageError {
    /// Extract the message from a backend error envelope, if present.
    pub fn from_envelope(envelope: &serde_json::Value) -> Option<Self> {
        let error = envelope.get("error")?;
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown backend error");
        Some(Self::Backend(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_envelope_extracts_message() {
        let envelope = json!({"error": {"type": "timeout_error", "message": "timed out"}});
        let error = StageError::from_envelope(&envelope).unwrap();
        assert!(matches!(error, StageError::Backend(ref m) if m == "timed out"));
    }

    #[test]
    fn test_from_envelope_ignores_success() {
        let envelope = json!({"choices": [{"message": {"content": "{}"}}]});
        assert!(StageError::from_envelope(&envelope).is_none());
    }

    #[test]
    fn test_from_envelope_without_message_field() {
        let envelope = json!({"error": {"code": 42}});
        let error = StageError::from_envelope(&envelope).unwrap();
        assert!(matches!(error, StageError::Backend(ref m) if m == "unknown backend error"));
    }
}
