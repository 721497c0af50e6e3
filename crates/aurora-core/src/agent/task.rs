//! Parameterized agent execution
//!
//! Every pipeline stage is the same machine with different parameters: a
//! system prompt, a required-field schema, progress labels, a temperature
//! and a fallback payload. [`AgentTask`] runs that machine against a
//! [`CompletionBackend`], either one-shot or streaming with incremental
//! JSON extraction.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::extract::{strip_markdown_fences, FeedOutcome, JsonStreamExtractor};
use super::failure::StageError;
use crate::ai::backend::CompletionBackend;
use crate::ai::client::CallOptions;
use crate::ai::streaming::StreamPart;
use crate::ai::types::ChatMessage;

/// Hard cap on waiting for the next stream part.
const STREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// Static description of one agent stage.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    pub name: &'static str,
    pub system_prompt: &'static str,
    /// Top-level fields a completion must carry to count as a result.
    pub required_fields: &'static [&'static str],
    /// Labels surfaced to the user while the model works.
    pub progress_steps: &'static [&'static str],
    pub temperature: f32,
    /// Builds the stage's degraded-but-valid payload from an error message.
    pub fallback: fn(&str) -> Value,
}

impl AgentSpec {
    pub fn fallback_payload(&self, message: &str) -> Value {
        (self.fallback)(message)
    }
}

/// Events produced by one streaming stage run.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A progress label, paced by the configured step delay.
    ProgressLabel(String),
    /// A complete object closed mid-stream; more may follow.
    Partial(Value),
    /// The last schema-valid object of the stream. Terminal.
    Final(Value),
    /// The stage failed; `fallback` is the payload to use instead. Terminal.
    Error { message: String, fallback: Value },
}

/// One runnable stage: a spec plus pacing configuration.
#[derive(Debug, Clone, Copy)]
pub struct AgentTask {
    spec: AgentSpec,
    step_delay: Duration,
}

impl AgentTask {
    pub fn new(spec: AgentSpec) -> Self {
        Self {
            spec,
            step_delay: Duration::ZERO,
        }
    }

    /// Delay inserted after each progress label and partial result.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    fn options(&self) -> CallOptions {
        CallOptions::with_temperature(self.spec.temperature)
    }

    /// One-shot run. Backend and parse failures resolve to the stage's
    /// fallback payload so callers always get a usable object.
    pub async fn resolve(
        &self,
        backend: &dyn CompletionBackend,
        messages: Vec<ChatMessage>,
    ) -> Value {
        match self.try_resolve(backend, messages).await {
            Ok(value) => value,
            Err(e) => {
                warn!("stage {} failed, using fallback: {}", self.spec.name, e);
                self.spec.fallback_payload(&e.to_string())
            }
        }
    }

    async fn try_resolve(
        &self,
        backend: &dyn CompletionBackend,
        messages: Vec<ChatMessage>,
    ) -> Result<Value, StageError> {
        let envelope = backend
            .complete(messages, &self.options())
            .await
            .map_err(|e| StageError::Backend(e.to_string()))?;

        if let Some(error) = StageError::from_envelope(&envelope) {
            return Err(error);
        }

        let content = envelope
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| StageError::Shape("no message content in completion".to_string()))?;

        let value: Value =
            serde_json::from_str(strip_markdown_fences(content)).map_err(StageError::Parse)?;

        if let Some(field) = self
            .spec
            .required_fields
            .iter()
            .find(|field| value.get(**field).is_none())
        {
            return Err(StageError::Schema((*field).to_string()));
        }

        Ok(value)
    }

    /// Streaming run. Progress labels come first, then partial objects as
    /// they close, then exactly one `Final` or `Error` event.
    pub fn resolve_streaming(
        &self,
        backend: Arc<dyn CompletionBackend>,
        messages: Vec<ChatMessage>,
    ) -> mpsc::UnboundedReceiver<AgentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = *self;

        tokio::spawn(async move {
            task.run_streaming(backend, messages, tx).await;
        });

        rx
    }

    async fn run_streaming(
        &self,
        backend: Arc<dyn CompletionBackend>,
        messages: Vec<ChatMessage>,
        tx: mpsc::UnboundedSender<AgentEvent>,
    ) {
        for step in self.spec.progress_steps {
            if tx
                .send(AgentEvent::ProgressLabel((*step).to_string()))
                .is_err()
            {
                return;
            }
            tokio::time::sleep(self.step_delay).await;
        }

        let mut parts = match backend.complete_stream(messages, &self.options()).await {
            Ok(parts) => parts,
            Err(e) => {
                warn!("stage {} failed to open stream: {}", self.spec.name, e);
                let message = e.to_string();
                let fallback = self.spec.fallback_payload(&message);
                let _ = tx.send(AgentEvent::Error { message, fallback });
                return;
            }
        };

        let mut extractor = JsonStreamExtractor::new(self.spec.required_fields);
        let mut stream_error: Option<String> = None;

        loop {
            let part = match tokio::time::timeout(STREAM_TIMEOUT, parts.recv()).await {
                Ok(Some(part)) => part,
                Ok(None) => break,
                Err(_) => {
                    warn!("stage {} stream timed out", self.spec.name);
                    stream_error = Some("stream timed out".to_string());
                    break;
                }
            };

            match part {
                StreamPart::TextDelta { delta } => {
                    if let FeedOutcome::Completed(value) = extractor.feed(&delta) {
                        debug!("stage {} produced a partial object", self.spec.name);
                        if tx.send(AgentEvent::Partial(value)).is_err() {
                            return;
                        }
                        tokio::time::sleep(self.step_delay).await;
                    }
                }
                StreamPart::Error { error } => {
                    warn!("stage {} stream error: {}", self.spec.name, error);
                    stream_error = Some(error);
                    break;
                }
            }
        }

        // A completed object outranks a late stream error.
        match extractor.finish() {
            Ok(value) => {
                let _ = tx.send(AgentEvent::Final(value));
            }
            Err(failure) => {
                let message = stream_error.unwrap_or_else(|| failure.to_string());
                let fallback = self.spec.fallback_payload(&message);
                let _ = tx.send(AgentEvent::Error { message, fallback });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{ScriptedBackend, ScriptedCall};
    use serde_json::json;

    const FIELDS: &[&str] = &["intent", "confidence", "entities"];
    const STEPS: &[&str] = &["第一步...", "第二步..."];

    fn fallback(message: &str) -> Value {
        json!({"intent": "解析错误", "confidence": 0.0, "entities": {"error": message}})
    }

    const SPEC: AgentSpec = AgentSpec {
        name: "intent_analysis",
        system_prompt: "prompt",
        required_fields: FIELDS,
        progress_steps: STEPS,
        temperature: 0.3,
        fallback,
    };

    async fn collect(mut rx: mpsc::UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_streaming_happy_path_event_order() {
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptedCall::deltas(&[
            "{\"intent\": \"咨询\", ",
            "\"confidence\": 0.9, \"entities\": {}}",
        ])]));
        let task = AgentTask::new(SPEC);
        let events = collect(task.resolve_streaming(backend, vec![])).await;

        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], AgentEvent::ProgressLabel(l) if l == "第一步..."));
        assert!(matches!(&events[1], AgentEvent::ProgressLabel(l) if l == "第二步..."));
        assert!(matches!(&events[2], AgentEvent::Partial(v) if v["intent"] == "咨询"));
        assert!(matches!(&events[3], AgentEvent::Final(v) if v["confidence"] == json!(0.9)));
    }

    #[tokio::test]
    async fn test_streaming_no_json_yields_error_with_fallback() {
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptedCall::deltas(&[
            "抱歉，我无法回答。",
        ])]));
        let task = AgentTask::new(SPEC);
        let events = collect(task.resolve_streaming(backend, vec![])).await;

        let last = events.last().unwrap();
        match last {
            AgentEvent::Error { fallback, .. } => {
                assert_eq!(fallback["intent"], "解析错误");
                assert_eq!(fallback["confidence"], json!(0.0));
            }
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_streaming_mid_stream_error_keeps_completed_object() {
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptedCall::Stream(vec![
            StreamPart::TextDelta {
                delta: "{\"intent\": \"a\", \"confidence\": 1.0, \"entities\": {}}".to_string(),
            },
            StreamPart::Error {
                error: "connection reset".to_string(),
            },
        ])]));
        let task = AgentTask::new(SPEC);
        let events = collect(task.resolve_streaming(backend, vec![])).await;

        assert!(matches!(events.last().unwrap(), AgentEvent::Final(v) if v["intent"] == "a"));
    }

    #[tokio::test]
    async fn test_streaming_error_before_any_object_uses_stream_message() {
        let backend = Arc::new(ScriptedBackend::new(vec![ScriptedCall::Stream(vec![
            StreamPart::Error {
                error: "connection reset".to_string(),
            },
        ])]));
        let task = AgentTask::new(SPEC);
        let events = collect(task.resolve_streaming(backend, vec![])).await;

        match events.last().unwrap() {
            AgentEvent::Error { message, .. } => assert_eq!(message, "connection reset"),
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_parses_one_shot_completion() {
        let backend = ScriptedBackend::new(vec![ScriptedCall::Envelope(json!({
            "choices": [{"message": {"content":
                "```json\n{\"intent\": \"a\", \"confidence\": 0.8, \"entities\": {}}\n```"}}]
        }))]);
        let task = AgentTask::new(SPEC);
        let value = task.resolve(&backend, vec![]).await;
        assert_eq!(value["intent"], "a");
    }

    #[tokio::test]
    async fn test_resolve_error_envelope_falls_back() {
        let backend = ScriptedBackend::new(vec![ScriptedCall::Envelope(json!({
            "error": {"type": "timeout_error", "message": "timed out"}
        }))]);
        let task = AgentTask::new(SPEC);
        let value = task.resolve(&backend, vec![]).await;
        assert_eq!(value["intent"], "解析错误");
        assert_eq!(value["entities"]["error"], "backend error: timed out");
    }

    #[tokio::test]
    async fn test_resolve_missing_field_falls_back() {
        let backend = ScriptedBackend::new(vec![ScriptedCall::Envelope(json!({
            "choices": [{"message": {"content": "{\"intent\": \"a\"}"}}]
        }))]);
        let task = AgentTask::new(SPEC);
        let value = task.resolve(&backend, vec![]).await;
        assert_eq!(value["intent"], "解析错误");
    }
}
