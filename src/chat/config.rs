//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the explicit
//! configuration structure every chat session is built from.

use arrrg_derive::CommandLine;

use crate::client::{DEFAULT_HOST, PREFERRED_MODEL, host_from_env};

/// Smallest history window that can be configured.
pub const MIN_HISTORY_WINDOW: usize = 1;

/// Largest history window that can be configured.
pub const MAX_HISTORY_WINDOW: usize = 50;

/// Command-line arguments for the ollama-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Server base address.
    #[arrrg(optional, "Ollama server address (default: $OLLAMA_HOST or http://localhost:11434)", "URL")]
    pub host: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemma3:1b if installed, else first listed)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Number of most recent messages sent per request.
    #[arrrg(optional, "Send only the last N messages per request (1-50)", "N")]
    pub history: Option<u32>,

    /// Ask for whole replies instead of streamed ones.
    #[arrrg(flag, "Wait for complete replies instead of streaming")]
    pub no_stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log requests and responses to stderr.
    #[arrrg(flag, "Log requests and responses to stderr")]
    pub verbose: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments and the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base address of the Ollama server.
    pub host: String,

    /// The model to use for generating responses.
    pub model: String,

    /// Whether replies are streamed fragment by fragment.
    pub stream: bool,

    /// Optional system prompt, added to the conversation when it starts.
    pub system_prompt: Option<String>,

    /// Send only the most recent N messages per request.
    /// `None` sends the whole conversation.
    pub history_window: Option<usize>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether requests and responses are logged.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Host: http://localhost:11434
    /// - Model: gemma3:1b
    /// - Streaming: enabled
    /// - History window: whole conversation
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: PREFERRED_MODEL.to_string(),
            stream: true,
            system_prompt: None,
            history_window: None,
            use_color: true,
            verbose: false,
        }
    }

    /// Creates a default config whose host comes from OLLAMA_HOST.
    pub fn from_env() -> Self {
        Self::new().with_host(host_from_env())
    }

    /// Sets the server address.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets streaming mode.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the history window, clamped to the supported range.
    pub fn with_history_window(mut self, window: Option<usize>) -> Self {
        self.history_window = window.map(clamp_history_window);
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            host: args.host.unwrap_or_else(host_from_env),
            model: args.model.unwrap_or_else(|| PREFERRED_MODEL.to_string()),
            stream: !args.no_stream,
            system_prompt: args.system.filter(|prompt| !prompt.trim().is_empty()),
            history_window: args.history.map(|n| clamp_history_window(n as usize)),
            use_color: !args.no_color,
            verbose: args.verbose,
        }
    }
}

fn clamp_history_window(window: usize) -> usize {
    window.clamp(MIN_HISTORY_WINDOW, MAX_HISTORY_WINDOW)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.host, "http://localhost:11434");
        assert_eq!(config.model, "gemma3:1b");
        assert!(config.stream);
        assert!(config.use_color);
        assert!(!config.verbose);
        assert!(config.system_prompt.is_none());
        assert!(config.history_window.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let args = ChatArgs::default();
        let config = ChatConfig::from(args);
        assert_eq!(config.host, host_from_env());
        assert_eq!(config.model, "gemma3:1b");
        assert!(config.stream);
        assert!(config.use_color);
        assert!(config.history_window.is_none());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            host: Some("http://10.0.0.5:11434".to_string()),
            model: Some("llama3:8b".to_string()),
            system: Some("You are helpful.".to_string()),
            history: Some(10),
            no_stream: true,
            no_color: true,
            verbose: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.host, "http://10.0.0.5:11434");
        assert_eq!(config.model, "llama3:8b");
        assert_eq!(config.system_prompt, Some("You are helpful.".to_string()));
        assert_eq!(config.history_window, Some(10));
        assert!(!config.stream);
        assert!(!config.use_color);
        assert!(config.verbose);
    }

    #[test]
    fn blank_system_prompt_is_dropped() {
        let args = ChatArgs {
            system: Some("   ".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::from(args).system_prompt.is_none());
    }

    #[test]
    fn history_window_is_clamped() {
        let args = ChatArgs {
            history: Some(500),
            ..ChatArgs::default()
        };
        assert_eq!(ChatConfig::from(args).history_window, Some(50));
        let config = ChatConfig::new().with_history_window(Some(0));
        assert_eq!(config.history_window, Some(1));
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_host("http://gpu-box:11434")
            .with_model("gemma3:4b")
            .with_stream(false)
            .with_system_prompt("Test prompt")
            .with_history_window(Some(20))
            .without_color();

        assert_eq!(config.host, "http://gpu-box:11434");
        assert_eq!(config.model, "gemma3:4b");
        assert!(!config.stream);
        assert_eq!(config.system_prompt, Some("Test prompt".to_string()));
        assert_eq!(config.history_window, Some(20));
        assert!(!config.use_color);
    }
}
