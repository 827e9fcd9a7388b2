//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction so the session
//! can drive different front ends.  The default implementation writes to the
//! terminal, using ANSI escape codes to set roles and errors apart.

use std::io::{self, Stdout, Write};

use crate::{Message, MessageRole};

/// ANSI escape code for bold text (used for role labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for system messages and hints).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the user label and success).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for yellow text (used for hints).
const ANSI_YELLOW: &str = "\x1b[33m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Capturing output in tests
pub trait Renderer: Send {
    /// Called once before the assistant's reply is rendered.
    fn start_response(&mut self);

    /// Print a chunk of response text.
    ///
    /// This is called once per fragment as a reply streams in, or once with
    /// the whole text for a complete reply.
    fn print_text(&mut self, text: &str);

    /// Called when a response is complete.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Called when the response is interrupted by the user.
    fn print_interrupted(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print troubleshooting advice that goes with an error.
    fn print_hint(&mut self, hint: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a success message.
    fn print_success(&mut self, message: &str);

    /// Print one message of the transcript with its role label.
    fn print_message(&mut self, message: &Message);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_response: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_response: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn label(&self, role: MessageRole) -> String {
        let label = role.label();
        if !self.use_color {
            return format!("{label}:");
        }
        let color = match role {
            MessageRole::User => ANSI_GREEN,
            MessageRole::Assistant => ANSI_CYAN,
            MessageRole::System => ANSI_DIM,
        };
        format!("{ANSI_BOLD}{color}{label}:{ANSI_RESET}")
    }

    fn end_response_line(&mut self) {
        if self.in_response {
            println!();
            self.in_response = false;
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self) {
        println!("{}", self.label(MessageRole::Assistant));
        self.in_response = true;
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn finish_response(&mut self) {
        self.end_response_line();
        println!();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.end_response_line();
        println!("[interrupted]");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_response_line();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_hint(&mut self, hint: &str) {
        if self.use_color {
            eprintln!("{ANSI_YELLOW}Hint: {hint}{ANSI_RESET}");
        } else {
            eprintln!("Hint: {hint}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
    }

    fn print_success(&mut self, message: &str) {
        if self.use_color {
            println!("{ANSI_GREEN}{message}{ANSI_RESET}");
        } else {
            println!("{message}");
        }
    }

    fn print_message(&mut self, message: &Message) {
        println!("{} {}", self.label(message.role()), message.content());
    }
}
