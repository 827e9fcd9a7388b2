//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the server.

use crate::chat::config::{MAX_HISTORY_WINDOW, MIN_HISTORY_WINDOW};
use crate::chat::plan::WeeklyPlanRequest;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the server,
/// except `/plan`, which composes a message and sends it.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Change the server address.
    Host(String),

    /// Change the model.
    Model(String),

    /// Refresh and list the models the server offers.
    Models,

    /// Probe the server.
    Check,

    /// Turn streaming on or off.
    Stream(bool),

    /// Send only the last N messages per request.
    History(usize),

    /// Send the whole conversation per request.
    ClearHistory,

    /// Add a system message, or report the current prompt when `None`.
    System(Option<String>),

    /// Compose and send the weekly exercise plan prompt.
    Plan(WeeklyPlanRequest),

    /// Reprint the conversation.
    Transcript,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics (message count, current model, etc.).
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use ollama_chat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model gemma3:1b").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "host" => match argument {
            Some(host) => ChatCommand::Host(host.to_string()),
            None => ChatCommand::Invalid("/host requires a server address".to_string()),
        },
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "models" | "refresh" => ChatCommand::Models,
        "check" => ChatCommand::Check,
        "stream" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Stream(value),
            None => ChatCommand::Invalid("/stream expects 'on' or 'off'".to_string()),
        },
        "history" => parse_history_command(argument),
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "plan" => match WeeklyPlanRequest::parse(argument.unwrap_or("")) {
            Ok(request) => ChatCommand::Plan(request),
            Err(err) => ChatCommand::Invalid(format!("/plan {err}")),
        },
        "transcript" => ChatCommand::Transcript,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_history_command(argument: Option<&str>) -> ChatCommand {
    match argument {
        Some(arg) if arg.eq_ignore_ascii_case("clear") || arg.eq_ignore_ascii_case("off") => {
            ChatCommand::ClearHistory
        }
        Some(arg) => match arg.parse::<usize>() {
            Ok(value) if (MIN_HISTORY_WINDOW..=MAX_HISTORY_WINDOW).contains(&value) => {
                ChatCommand::History(value)
            }
            _ => ChatCommand::Invalid(format!(
                "/history expects a number between {MIN_HISTORY_WINDOW} and {MAX_HISTORY_WINDOW}, or 'clear'"
            )),
        },
        None => ChatCommand::Invalid("/history requires a value".to_string()),
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /host <url>            Change the Ollama server (e.g., /host http://127.0.0.1:11434)
  /model <name>          Change the model (e.g., /model gemma3:1b)
  /models                Refresh and list the server's models
  /check                 Check the connection to the server
  /stream on|off         Stream replies or wait for whole ones
  /history <n>           Send only the last n messages, 1-50 (or 'clear')
  /system [prompt]       Add a system message (no argument shows the current one)
  /plan key=value ...    Ask for a weekly exercise plan
                         keys: age=10-120 problems=<text> minutes=10-240 goal=lose|gain
  /transcript            Show the conversation so far
  /clear                 Clear conversation history
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
