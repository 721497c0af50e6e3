//! Streaming protocol between the completion backend and its consumers.

/// One fragment of a streaming completion response.
///
/// The stream ends when the channel closes; there is no explicit terminal
/// variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPart {
    /// Incremental text content from `choices[0].delta.content`.
    TextDelta { delta: String },

    /// The backend reported an error mid-stream; no further deltas follow.
    Error { error: String },
}
