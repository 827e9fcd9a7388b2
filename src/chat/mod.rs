//! Chat application module for interactive conversations with a local model.
//!
//! This module provides a REPL chat interface built on top of the
//! ollama-chat client library. It supports:
//!
//! - Streamed or whole replies, switchable at run time
//! - Slash commands for session control
//! - A weekly exercise plan form
//! - Configurable server, model, system prompt and history window
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Conversation state and turn handling
//! - [`commands`]: Slash command parsing
//! - [`plan`]: The weekly exercise plan prompt

mod commands;
mod config;
mod plan;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, MAX_HISTORY_WINDOW, MIN_HISTORY_WINDOW};
pub use plan::{FitnessGoal, WeeklyPlanRequest};
pub use session::{ChatSession, SessionStats, TurnState};
