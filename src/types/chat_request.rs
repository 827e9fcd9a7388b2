use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Message, MessageRole};

/// Body of a `POST /api/chat` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// The model that should answer.
    pub model: String,

    /// The conversation so far, oldest first.
    pub messages: Vec<Message>,

    /// Whether the server should answer with newline-delimited chunks.
    pub stream: bool,
}

impl ChatRequest {
    /// Create a new `ChatRequest`.
    pub fn new(model: impl Into<String>, messages: Vec<Message>, stream: bool) -> Self {
        Self {
            model: model.into(),
            messages,
            stream,
        }
    }

    /// Checks the request before it goes on the wire.
    ///
    /// The history must be non-empty and contain at least one user turn, and
    /// a model must be named.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::validation(
                "a model identifier is required",
                Some("model".to_string()),
            ));
        }
        if self.messages.is_empty() {
            return Err(Error::validation(
                "conversation history is empty",
                Some("messages".to_string()),
            ));
        }
        if !self
            .messages
            .iter()
            .any(|message| message.role() == MessageRole::User)
        {
            return Err(Error::validation(
                "conversation history has no user turn",
                Some("messages".to_string()),
            ));
        }
        Ok(())
    }
}
