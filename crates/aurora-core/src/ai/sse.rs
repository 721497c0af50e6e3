//! SSE framing for streaming completion responses.
//!
//! HTTP byte chunks do not align with SSE line boundaries, so incoming
//! bytes are re-split on newlines with a carry-over buffer before the
//! `data:` payloads are parsed.

use serde_json::Value;

use super::streaming::StreamPart;

/// Re-splits arbitrary byte chunks into complete lines, carrying partial
/// trailing lines over to the next chunk.
///
/// Carry-over is kept as raw bytes: a chunk boundary can fall inside a
/// multi-byte UTF-8 character, so decoding happens only on complete lines.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    partial: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte chunk, returning every line completed by it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.partial.drain(..=pos).collect();
            while matches!(line.last(), Some(b'\n' | b'\r')) {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Drain whatever is left after the stream ends (a final line without a
    /// trailing newline).
    pub fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.partial);
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }
}

/// Parse one SSE line into a stream part.
///
/// Returns `None` for ignorable lines: blanks, comments, the `[DONE]`
/// sentinel, and data payloads without text content (role-only deltas,
/// finish chunks). Data payloads that are not valid JSON are forwarded
/// verbatim as text, matching the backend's fallback framing.
pub fn parse_sse_line(line: &str) -> Option<StreamPart> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let data = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
    if data.trim() == "[DONE]" {
        return None;
    }

    let json: Value = match serde_json::from_str(data) {
        Ok(json) => json,
        Err(e) => {
            tracing::debug!("Non-JSON SSE data line ({}), forwarding as text", e);
            return Some(StreamPart::TextDelta {
                delta: data.to_string(),
            });
        }
    };

    if let Some(error) = json.get("error") {
        return Some(StreamPart::Error {
            error: error_message(error),
        });
    }

    let content = json
        .pointer("/choices/0/delta/content")
        .and_then(|c| c.as_str())
        .unwrap_or_default();

    if content.is_empty() {
        return None;
    }

    Some(StreamPart::TextDelta {
        delta: content.to_string(),
    })
}

/// Extract a human-readable message from a backend error payload.
pub fn error_message(error: &Value) -> String {
    if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
        if !message.is_empty() {
            return message.to_string();
        }
    }
    if let Some(text) = error.as_str() {
        if !text.is_empty() {
            return text.to_string();
        }
    }
    error.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_reassembles_split_lines() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push_chunk(b"data: {\"cho").is_empty());
        let lines = buffer.push_chunk(b"ices\": []}\n\ndata: x\n");
        assert_eq!(
            lines,
            vec!["data: {\"choices\": []}".to_string(), String::new(), "data: x".to_string()]
        );
    }

    #[test]
    fn test_line_buffer_preserves_multibyte_chars_split_across_chunks() {
        let payload = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n".as_bytes();
        // Cut inside the three-byte encoding of 你.
        let cut = payload
            .windows(3)
            .position(|w| w == "你".as_bytes())
            .unwrap()
            + 1;

        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push_chunk(&payload[..cut]).is_empty());
        let lines = buffer.push_chunk(&payload[cut..]);
        assert_eq!(lines.len(), 1);

        let part = parse_sse_line(&lines[0]).unwrap();
        assert_eq!(
            part,
            StreamPart::TextDelta {
                delta: "你好".to_string()
            }
        );
    }

    #[test]
    fn test_line_buffer_strips_crlf() {
        let mut buffer = SseLineBuffer::new();
        let lines = buffer.push_chunk(b"data: a\r\n");
        assert_eq!(lines, vec!["data: a".to_string()]);
    }

    #[test]
    fn test_line_buffer_finish_returns_tail() {
        let mut buffer = SseLineBuffer::new();
        buffer.push_chunk(b"data: tail");
        assert_eq!(buffer.finish(), Some("data: tail".to_string()));
    }

    #[test]
    fn test_parse_delta_content() {
        let part =
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":"你好"}}]}"#).unwrap();
        assert_eq!(
            part,
            StreamPart::TextDelta {
                delta: "你好".to_string()
            }
        );
    }

    #[test]
    fn test_parse_skips_done_and_blank() {
        assert!(parse_sse_line("data: [DONE]").is_none());
        assert!(parse_sse_line("").is_none());
        assert!(parse_sse_line(": keep-alive").is_none());
    }

    #[test]
    fn test_parse_skips_role_only_delta() {
        assert!(parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).is_none());
    }

    #[test]
    fn test_parse_error_payload() {
        let part =
            parse_sse_line(r#"data: {"error":{"message":"rate limited","type":"http_error"}}"#)
                .unwrap();
        assert_eq!(
            part,
            StreamPart::Error {
                error: "rate limited".to_string()
            }
        );
    }

    #[test]
    fn test_parse_non_json_data_forwarded_as_text() {
        let part = parse_sse_line("data: plain text fragment").unwrap();
        assert_eq!(
            part,
            StreamPart::TextDelta {
                delta: "plain text fragment".to_string()
            }
        );
    }
}
