//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which holds the conversation
//! and its configuration, and runs one turn at a time against the server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::chat::config::ChatConfig;
use crate::error::Result;
use crate::observability::{
    SESSION_CANCELLATIONS, SESSION_TURN_DURATION, SESSION_TURN_FAILURES, SESSION_TURNS,
};
use crate::types::{ChatCompletion, HostStatus, Message, Usage};
use crate::{ChatReply, Error, OllamaClient, Renderer};

/// Where the session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Ready for the next submission.
    Idle,
    /// A request is in flight.
    AwaitingResponse,
}

/// Marks a turn in flight until dropped.
///
/// Dropping the guard returns the session to idle, including when the turn
/// future itself is dropped before it finishes.
struct TurnGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// A chat session that manages conversation state and API interactions.
///
/// The session owns the ordered message history and the connection settings.
/// Messages are only ever appended; the history shrinks only when the whole
/// conversation is cleared.
pub struct ChatSession {
    client: OllamaClient,
    config: ChatConfig,
    messages: Vec<Message>,
    busy: Arc<AtomicBool>,
    models: Vec<String>,
    usage_totals: Usage,
    last_turn_usage: Option<Usage>,
    request_count: u64,
    failure_count: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The server address.
    pub host: String,
    /// The model used for the session.
    pub model: String,
    /// Whether replies are streamed.
    pub stream: bool,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// The history window, if one is set.
    pub history_window: Option<usize>,
    /// The system prompt, if any.
    pub system_prompt: Option<String>,
    /// Total number of chat requests made.
    pub total_requests: u64,
    /// Turns that ended in a failure or a cancellation.
    pub failed_turns: u64,
    /// Total prompt tokens across all replies.
    pub total_prompt_tokens: u64,
    /// Total generated tokens across all replies.
    pub total_output_tokens: u64,
    /// Prompt tokens for the last reply, if available.
    pub last_turn_prompt_tokens: Option<u64>,
    /// Generated tokens for the last reply, if available.
    pub last_turn_output_tokens: Option<u64>,
}

impl ChatSession {
    /// Creates a new chat session with the given client and configuration.
    ///
    /// The session is bound to the client's address, and a configured
    /// system prompt becomes the first message of the conversation.
    pub fn new(client: OllamaClient, config: ChatConfig) -> Self {
        let mut config = config;
        config.host = client.base_url().to_string();
        let mut session = Self {
            client,
            config,
            messages: Vec::new(),
            busy: Arc::new(AtomicBool::new(false)),
            models: Vec::new(),
            usage_totals: Usage::default(),
            last_turn_usage: None,
            request_count: 0,
            failure_count: 0,
        };
        if let Some(prompt) = session.config.system_prompt.clone() {
            session.append(Message::system(prompt));
        }
        session
    }

    /// Builds the client from the configured host and creates a session.
    pub fn from_config(config: ChatConfig) -> Result<Self> {
        let client = OllamaClient::with_options(Some(config.host.clone()), None)?;
        Ok(Self::new(client, config))
    }

    /// Adds a message to the end of the conversation.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Clears the conversation history.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The conversation, in the order the messages were added.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the current turn state.
    pub fn state(&self) -> TurnState {
        if self.busy.load(Ordering::Acquire) {
            TurnState::AwaitingResponse
        } else {
            TurnState::Idle
        }
    }

    /// Claims the session for one turn, or `None` if a turn is in flight.
    fn begin_turn(&self) -> Option<TurnGuard> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(TurnGuard {
            busy: Arc::clone(&self.busy),
        })
    }

    /// The messages the next request will carry.
    ///
    /// Without a history window this is the whole conversation; with one it
    /// is the last N messages of it.
    pub fn outgoing_history(&self) -> &[Message] {
        match self.config.history_window {
            Some(window) if window < self.messages.len() => {
                &self.messages[self.messages.len() - window..]
            }
            _ => &self.messages,
        }
    }

    /// Sends a user message and renders the reply.
    ///
    /// This method:
    /// 1. Adds the user message to history
    /// 2. Sends the history to the server
    /// 3. Renders the reply, fragment by fragment when streaming
    /// 4. Adds the complete assistant reply to history
    ///
    /// On failure the user message stays in the history and no assistant
    /// message is added.  Cancelling `cancel` ends the turn with an abort
    /// and throws away any partial reply.
    ///
    /// # Errors
    ///
    /// Returns `Busy` if a turn is already in flight, a validation error for
    /// blank input, and otherwise whatever the request or stream failed with.
    pub async fn send_message(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(_turn) = self.begin_turn() else {
            return Err(Error::busy("a response is still being generated"));
        };
        if user_input.trim().is_empty() {
            return Err(Error::validation(
                "message is empty",
                Some("content".to_string()),
            ));
        }

        self.append(Message::user(user_input));
        SESSION_TURNS.click();
        let start = Instant::now();

        let result = self.run_turn(renderer, cancel).await;

        SESSION_TURN_DURATION.add(start.elapsed().as_secs_f64());

        match result {
            Ok(completion) => {
                tracing::debug!(
                    model = %self.config.model,
                    chars = completion.text.len(),
                    eval_count = ?completion.usage.eval_count,
                    "turn complete"
                );
                self.append(Message::assistant(completion.text));
                self.record_usage(completion.usage);
                Ok(())
            }
            Err(err) => {
                self.failure_count = self.failure_count.saturating_add(1);
                if err.is_abort() {
                    SESSION_CANCELLATIONS.click();
                    tracing::debug!("turn cancelled");
                } else {
                    SESSION_TURN_FAILURES.click();
                    tracing::warn!(error = %err, model = %self.config.model, "turn failed");
                }
                Err(err)
            }
        }
    }

    async fn run_turn(
        &mut self,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        self.request_count = self.request_count.saturating_add(1);
        let history = self.outgoing_history();

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                renderer.print_interrupted();
                return Err(Error::abort("cancelled while waiting for the server"));
            }
            reply = self.client.send(history, &self.config.model, self.config.stream) => reply?,
        };

        match reply {
            ChatReply::Complete(completion) => {
                renderer.start_response();
                renderer.print_text(&completion.text);
                renderer.finish_response();
                Ok(completion)
            }
            ChatReply::Streaming(mut fragments) => {
                renderer.start_response();
                let mut text = String::new();
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            renderer.print_interrupted();
                            return Err(Error::abort("cancelled while streaming"));
                        }
                        next = fragments.next() => next,
                    };
                    match next {
                        Some(Ok(fragment)) => {
                            renderer.print_text(&fragment);
                            text.push_str(&fragment);
                        }
                        Some(Err(err)) => return Err(err),
                        None => break,
                    }
                }
                renderer.finish_response();
                Ok(ChatCompletion {
                    text,
                    usage: fragments.usage().unwrap_or_default(),
                })
            }
        }
    }

    /// Points the session at another server.
    ///
    /// The address is validated first; on failure nothing changes.
    pub fn set_host(&mut self, host: &str) -> Result<()> {
        let client = self.client.rebind(host)?;
        self.config.host = client.base_url().to_string();
        self.client = client;
        self.models.clear();
        Ok(())
    }

    /// Returns the current server address.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    /// Returns the current model.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Turns streaming of replies on or off.
    pub fn set_stream(&mut self, stream: bool) {
        self.config.stream = stream;
    }

    /// Returns whether replies are streamed.
    pub fn stream(&self) -> bool {
        self.config.stream
    }

    /// Sets or clears the history window.
    pub fn set_history_window(&mut self, window: Option<usize>) {
        self.config = self.config.clone().with_history_window(window);
    }

    /// Returns the history window, if one is set.
    pub fn history_window(&self) -> Option<usize> {
        self.config.history_window
    }

    /// Sets the system prompt and adds it to the conversation.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.append(Message::system(prompt.clone()));
        self.config.system_prompt = Some(prompt);
    }

    /// Returns the current system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.config.system_prompt.as_deref()
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Asks the server for its models and remembers them.
    pub async fn refresh_models(&mut self) -> Result<&[String]> {
        self.models = self.client.list_models().await?;
        Ok(&self.models)
    }

    /// Models from the last successful refresh.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Probes the server root.
    pub async fn check_connection(&self) -> Result<HostStatus> {
        self.client.check_host().await
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            host: self.config.host.clone(),
            model: self.config.model.clone(),
            stream: self.config.stream,
            message_count: self.message_count(),
            history_window: self.config.history_window,
            system_prompt: self.config.system_prompt.clone(),
            total_requests: self.request_count,
            failed_turns: self.failure_count,
            total_prompt_tokens: self.usage_totals.prompt_tokens(),
            total_output_tokens: self.usage_totals.output_tokens(),
            last_turn_prompt_tokens: self.last_turn_usage.map(|usage| usage.prompt_tokens()),
            last_turn_output_tokens: self.last_turn_usage.map(|usage| usage.output_tokens()),
        }
    }

    fn record_usage(&mut self, usage: Usage) {
        self.last_turn_usage = Some(usage);
        self.usage_totals = self.usage_totals + usage;
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("config", &self.config)
            .field("messages", &self.messages.len())
            .field("state", &self.state())
            .finish()
    }
}
