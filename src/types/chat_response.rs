use serde::{Deserialize, Serialize};

use crate::types::{Message, Usage};

/// One object returned by `POST /api/chat`.
///
/// In non-streaming mode the server sends exactly one of these with `done`
/// set.  In streaming mode it sends one per line, each carrying the next
/// fragment in `message.content`; the last one has `done` set and carries the
/// usage counters.  A line may instead carry only an `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The model that produced the response.
    #[serde(default)]
    pub model: String,

    /// Server-side timestamp, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// The message, or message fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    /// Set on the final object.
    #[serde(default)]
    pub done: bool,

    /// Why generation stopped, e.g. `"stop"` or `"length"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    /// Counters, present on the final object.
    #[serde(flatten)]
    pub usage: Usage,

    /// Error reported in place of a message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// The text carried by this object, empty if none.
    pub fn text(&self) -> &str {
        self.message
            .as_ref()
            .map(|message| message.content())
            .unwrap_or("")
    }
}

/// A complete, non-streamed assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    /// The full assistant text.
    pub text: String,

    /// Counters reported by the server.
    pub usage: Usage,
}
