//! Logging trait for Ollama client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all traffic passing through the [`OllamaClient`](crate::OllamaClient).

use crate::{ChatRequest, ChatResponse};

/// A trait for logging Ollama client operations.
///
/// Implement this trait to capture and record every chat exchange, including
/// both complete responses and the individual chunks of a streamed reply.
///
/// # Example
///
/// ```rust,ignore
/// use ollama_chat::{ChatRequest, ChatResponse, ClientLogger};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &ChatRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_response(&self, response: &ChatResponse) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Response: {}", serde_json::to_string(response).unwrap()).unwrap();
///     }
///
///     fn log_stream_chunk(&self, chunk: &ChatResponse) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Chunk: {}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log an outbound chat request, just before it is sent.
    fn log_request(&self, request: &ChatRequest);

    /// Log a complete response from a non-streaming call.
    fn log_response(&self, response: &ChatResponse);

    /// Log one chunk of a streaming response, including the final one.
    fn log_stream_chunk(&self, chunk: &ChatResponse);
}

/// A [`ClientLogger`] that forwards everything to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingClientLogger;

impl ClientLogger for TracingClientLogger {
    fn log_request(&self, request: &ChatRequest) {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "chat request"
        );
    }

    fn log_response(&self, response: &ChatResponse) {
        tracing::debug!(
            model = %response.model,
            chars = response.text().len(),
            done_reason = ?response.done_reason,
            eval_count = ?response.usage.eval_count,
            "chat response"
        );
    }

    fn log_stream_chunk(&self, chunk: &ChatResponse) {
        tracing::trace!(done = chunk.done, fragment = chunk.text(), "stream chunk");
    }
}
