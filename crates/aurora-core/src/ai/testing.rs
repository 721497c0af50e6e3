//! In-memory backends for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::mpsc;

use super::backend::CompletionBackend;
use super::client::CallOptions;
use super::streaming::StreamPart;
use super::types::ChatMessage;

/// What one scripted call produces.
#[derive(Debug, Clone)]
pub(crate) enum ScriptedCall {
    /// Stream these parts in order, then close the channel.
    Stream(Vec<StreamPart>),
    /// Resolve a one-shot call with this envelope.
    Envelope(Value),
}

impl ScriptedCall {
    /// A stream of plain text deltas.
    pub(crate) fn deltas(fragments: &[&str]) -> Self {
        Self::Stream(
            fragments
                .iter()
                .map(|f| StreamPart::TextDelta {
                    delta: (*f).to_string(),
                })
                .collect(),
        )
    }
}

/// Backend that replays a fixed script, one entry per call.
pub(crate) struct ScriptedBackend {
    calls: Mutex<Vec<ScriptedCall>>,
    calls_made: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn new(calls: Vec<ScriptedCall>) -> Self {
        Self {
            calls: Mutex::new(calls),
            calls_made: AtomicUsize::new(0),
        }
    }

    /// How many completion calls (one-shot or streaming) have been made.
    pub(crate) fn calls_made(&self) -> usize {
        self.calls_made.load(Ordering::SeqCst)
    }

    fn next_call(&self) -> ScriptedCall {
        self.calls_made.fetch_add(1, Ordering::SeqCst);
        let mut calls = self.calls.lock().unwrap();
        if calls.is_empty() {
            panic!("scripted backend exhausted");
        }
        calls.remove(0)
    }
}

#[async_trait::async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _messages: Vec<ChatMessage>, _options: &CallOptions) -> Result<Value> {
        match self.next_call() {
            ScriptedCall::Envelope(value) => Ok(value),
            ScriptedCall::Stream(_) => panic!("scripted a stream for a one-shot call"),
        }
    }

    async fn complete_stream(
        &self,
        _messages: Vec<ChatMessage>,
        _options: &CallOptions,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>> {
        let parts = match self.next_call() {
            ScriptedCall::Stream(parts) => parts,
            ScriptedCall::Envelope(_) => panic!("scripted an envelope for a streaming call"),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        for part in parts {
            let _ = tx.send(part);
        }
        Ok(rx)
    }
}
