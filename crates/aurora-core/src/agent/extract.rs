//! Incremental JSON extraction from streamed model output
//!
//! Models asked for JSON answer in fragments, often wrapped in Markdown
//! fences, sometimes preceded by prose, sometimes emitting several objects
//! in one response. [`JsonStreamExtractor`] accumulates fragments and
//! surfaces every complete object as it closes, tracking brace depth so a
//! parse is only attempted at a plausible object boundary. The last
//! complete object that carries all required fields wins.

use serde_json::Value;
use thiserror::Error;

/// Why a stream ended without producing a usable object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    /// The stream never contained an opening brace.
    #[error("no JSON object detected in stream")]
    NoJsonDetected,
    /// An object was opened but never closed to a parseable state.
    #[error("stream ended with incomplete JSON")]
    IncompleteJson,
    /// Complete objects parsed, but none carried all required fields.
    #[error("JSON parsed but missing required field `{0}`")]
    SchemaViolation(String),
}

/// Outcome of feeding one fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    /// Still accumulating; nothing to report.
    Pending,
    /// A complete object with all required fields just closed.
    Completed(Value),
}

/// Strip a Markdown code fence from around a JSON candidate.
///
/// Handles ```json and bare ``` prefixes and a trailing ```; text that is
/// not fenced passes through untouched. Never fails.
pub fn strip_markdown_fences(text: &str) -> &str {
    let mut candidate = text.trim();
    if let Some(rest) = candidate.strip_prefix("```json") {
        candidate = rest;
    } else if let Some(rest) = candidate.strip_prefix("```") {
        candidate = rest;
    }
    if let Some(rest) = candidate.strip_suffix("```") {
        candidate = rest;
    }
    candidate.trim()
}

/// Brace-depth state machine over streamed text fragments.
///
/// Depth tracking is deliberately naive: braces inside string literals are
/// counted too. Model output that embeds braces in strings will simply fail
/// the parse attempt at a false boundary and keep accumulating, so the
/// common case stays cheap and the pathological case degrades to waiting
/// for the next boundary.
#[derive(Debug, Default)]
pub struct JsonStreamExtractor {
    buffer: String,
    depth: u32,
    in_object: bool,
    seen_open_brace: bool,
    last_completed: Option<Value>,
    missing_field: Option<String>,
    required_fields: &'static [&'static str],
}

impl JsonStreamExtractor {
    pub fn new(required_fields: &'static [&'static str]) -> Self {
        Self {
            required_fields,
            ..Self::default()
        }
    }

    /// Feed one fragment; returns `Completed` each time a full object with
    /// all required fields closes.
    pub fn feed(&mut self, fragment: &str) -> FeedOutcome {
        self.buffer.push_str(fragment);

        let mut outcome = FeedOutcome::Pending;
        for ch in fragment.chars() {
            match ch {
                '{' => {
                    self.depth += 1;
                    self.in_object = true;
                    self.seen_open_brace = true;
                }
                '}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 && self.in_object {
                        if let Some(value) = self.try_complete() {
                            outcome = FeedOutcome::Completed(value);
                        }
                    }
                }
                _ => {}
            }
        }
        outcome
    }

    /// Attempt to parse the whole buffer as one object. Only called at a
    /// zero-depth boundary. Failure keeps the buffer for further input.
    fn try_complete(&mut self) -> Option<Value> {
        let candidate = strip_markdown_fences(&self.buffer);
        let value: Value = match serde_json::from_str(candidate) {
            Ok(value) => value,
            Err(_) => return None,
        };

        if let Some(missing) = self.first_missing_field(&value) {
            self.missing_field = Some(missing.to_string());
            return None;
        }

        self.last_completed = Some(value.clone());
        self.buffer.clear();
        self.in_object = false;
        Some(value)
    }

    fn first_missing_field(&self, value: &Value) -> Option<&'static str> {
        self.required_fields
            .iter()
            .find(|field| value.get(**field).is_none())
            .copied()
    }

    /// Consume the extractor at end-of-stream.
    ///
    /// Returns the last complete object that satisfied the schema, or a
    /// failure describing how far the stream got.
    pub fn finish(self) -> Result<Value, ExtractionFailure> {
        if let Some(value) = self.last_completed {
            return Ok(value);
        }
        if !self.seen_open_brace {
            return Err(ExtractionFailure::NoJsonDetected);
        }
        if let Some(field) = self.missing_field {
            return Err(ExtractionFailure::SchemaViolation(field));
        }
        Err(ExtractionFailure::IncompleteJson)
    }
}
