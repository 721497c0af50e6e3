//! Pipeline event protocol
//!
//! Events are serialized as tagged JSON objects and streamed to the caller
//! in order. Every stage opens with a `status: started` event and closes
//! with `status: completed` or `status: skipped`, so consumers can render
//! stage lifecycles without tracking pipeline internals.

use serde::Serialize;
use serde_json::Value;

/// Stage names as they appear on the wire.
pub mod stage {
    pub const PIPELINE: &str = "pipeline";
    pub const INTENT_ANALYSIS: &str = "intent_analysis";
    pub const AI_RESPONSE: &str = "ai_response";
    pub const QUESTION_ANALYSIS: &str = "question_analysis";
    pub const COURSE_RECOMMENDATION: &str = "course_recommendation";
    pub const COLLECTION_STRATEGY: &str = "collection_strategy";
}

/// One event on the pipeline's output stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Stage lifecycle marker, optionally carrying a progress message.
    Status {
        stage: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Intermediate data from a stage, emitted as objects close mid-stream.
    Progress { stage: &'static str, data: Value },
    /// Final result of a stage.
    Result { stage: &'static str, data: Value },
    /// A stage or the pipeline hit an error. Stage errors are followed by
    /// a fallback `Result`; a pipeline error ends the run.
    Error { stage: &'static str, message: String },
    /// End of stream. Always the last event, even after an error.
    Done,
}

impl PipelineEvent {
    pub fn started(stage: &'static str) -> Self {
        Self::Status {
            stage,
            status: Some("started"),
            message: None,
        }
    }

    pub fn completed(stage: &'static str) -> Self {
        Self::Status {
            stage,
            status: Some("completed"),
            message: None,
        }
    }

    pub fn skipped(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Status {
            stage,
            status: Some("skipped"),
            message: Some(reason.into()),
        }
    }

    pub fn progress_message(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Status {
            stage,
            status: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_format() {
        let event = PipelineEvent::started(stage::INTENT_ANALYSIS);
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(
            wire,
            json!({"kind": "status", "stage": "intent_analysis", "status": "started"})
        );
    }

    #[test]
    fn test_progress_message_omits_status() {
        let event = PipelineEvent::progress_message(stage::AI_RESPONSE, "正在分析问题...");
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(
            wire,
            json!({"kind": "status", "stage": "ai_response", "message": "正在分析问题..."})
        );
    }

    #[test]
    fn test_done_wire_format() {
        let wire = serde_json::to_value(PipelineEvent::Done).unwrap();
        assert_eq!(wire, json!({"kind": "done"}));
    }
}
