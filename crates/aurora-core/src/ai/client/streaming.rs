//! Streaming API calls over SSE
//!
//! The HTTP response is handed to a spawned task that splits the byte
//! stream into SSE lines and forwards text deltas over an unbounded
//! channel. A closed channel marks the end of the stream.

use std::time::Instant;

use anyhow::{anyhow, Result};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{CallOptions, LlmClient};
use crate::ai::sse::{parse_sse_line, SseLineBuffer};
use crate::ai::streaming::StreamPart;
use crate::ai::types::ChatMessage;

impl LlmClient {
    /// Make a streaming chat-completion call.
    ///
    /// Fails fast on connection errors and non-success statuses; once the
    /// stream is open, mid-stream failures arrive as [`StreamPart::Error`].
    pub async fn call_streaming(
        &self,
        messages: &[ChatMessage],
        options: &CallOptions,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>> {
        let call_start = Instant::now();
        let body = self.build_body(messages, options, true);
        let url = self.config().api_url();
        info!("streaming call to {} with {} messages", url, messages.len());

        let response = self.build_request(&url).json(&body).send().await?;
        let status = response.status();
        info!("stream response: {} in {:?}", status, call_start.elapsed());

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read error body>".to_string());
            return Err(anyhow!("API error {}: {}", status, error_text));
        }

        Ok(start_sse_stream(response))
    }
}

fn start_sse_stream(response: reqwest::Response) -> mpsc::UnboundedReceiver<StreamPart> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut bytes = response.bytes_stream();
        let mut lines = SseLineBuffer::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("stream transport error: {}", e);
                    let _ = tx.send(StreamPart::Error {
                        error: format!("stream error: {}", e),
                    });
                    return;
                }
            };
            for line in lines.push_chunk(&chunk) {
                if let Some(part) = parse_sse_line(&line) {
                    if tx.send(part).is_err() {
                        debug!("stream receiver dropped, stopping");
                        return;
                    }
                }
            }
        }

        // Flush any unterminated trailing line.
        if let Some(line) = lines.finish() {
            if let Some(part) = parse_sse_line(&line) {
                let _ = tx.send(part);
            }
        }
        debug!("stream complete");
    });

    rx
}
