//! Interactive chat application for a local Ollama server.
//!
//! This binary provides a REPL for chatting with models served by Ollama,
//! streaming replies as they are generated.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage: $OLLAMA_HOST or http://localhost:11434, best available model
//! ollama-chat
//!
//! # Talk to another machine with a specific model
//! ollama-chat --host http://10.0.0.5:11434 --model llama3:8b
//!
//! # Set a system prompt and keep requests short
//! ollama-chat --system "You are a fitness coach" --history 10
//!
//! # Wait for whole replies, without colors
//! ollama-chat --no-stream --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/host <url>` - Change the server
//! - `/models` - List the server's models
//! - `/model <name>` - Change the model
//! - `/plan key=value ...` - Ask for a weekly exercise plan
//! - `/quit` - Exit the application

use std::sync::{Arc, Mutex};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ollama_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use ollama_chat::{Error, OllamaClient, PREFERRED_MODEL, TracingClientLogger, preferred_model};

/// Environment variable holding the log filter.
const LOG_ENV_VAR: &str = "OLLAMA_CHAT_LOG";

/// Main entry point for the ollama-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("ollama-chat [OPTIONS]");
    let pick_model = args.model.is_none();
    let config = ChatConfig::from(args);
    init_logging(config.verbose);
    let use_color = config.use_color;

    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut client = OllamaClient::with_options(Some(config.host.clone()), None)?;
    if config.verbose {
        client = client.with_logger(Arc::new(TracingClientLogger));
    }
    let mut session = ChatSession::new(client, config);
    let mut rl = DefaultEditor::new()?;

    // Token of the current turn; Ctrl+C cancels it. Between turns it holds a
    // fresh token that nothing waits on.
    let current_turn = Arc::new(Mutex::new(CancellationToken::new()));
    let handler_turn = current_turn.clone();
    ctrlc::set_handler(move || {
        let token = match handler_turn.lock() {
            Ok(token) => token,
            Err(poisoned) => poisoned.into_inner(),
        };
        token.cancel();
    })?;

    if pick_model {
        choose_model(&mut session, &mut renderer).await;
    }

    println!(
        "Ollama Chat (server: {}, model: {})",
        session.host(),
        session.model()
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Host(host) => match session.set_host(&host) {
                            Ok(()) => {
                                renderer.print_info(&format!("Server set to: {}", session.host()));
                                list_models(&mut session, &mut renderer).await;
                            }
                            Err(err) => report(&mut renderer, &err),
                        },
                        ChatCommand::Model(model) => {
                            session.set_model(model.clone());
                            renderer.print_info(&format!("Model changed to: {}", model));
                        }
                        ChatCommand::Models => {
                            list_models(&mut session, &mut renderer).await;
                        }
                        ChatCommand::Check => match session.check_connection().await {
                            Ok(status) => renderer.print_success(&status.to_string()),
                            Err(err) => report(&mut renderer, &err),
                        },
                        ChatCommand::Stream(stream) => {
                            session.set_stream(stream);
                            if stream {
                                renderer.print_info("Streaming enabled.");
                            } else {
                                renderer.print_info("Streaming disabled.");
                            }
                        }
                        ChatCommand::History(window) => {
                            session.set_history_window(Some(window));
                            renderer.print_info(&format!(
                                "Sending the last {window} messages per request."
                            ));
                        }
                        ChatCommand::ClearHistory => {
                            session.set_history_window(None);
                            renderer.print_info("Sending the whole conversation per request.");
                        }
                        ChatCommand::System(Some(prompt)) => {
                            session.set_system_prompt(prompt.clone());
                            renderer.print_info(&format!("System prompt set to: {}", prompt));
                        }
                        ChatCommand::System(None) => match session.system_prompt() {
                            Some(prompt) => {
                                renderer.print_info(&format!("System prompt: {}", prompt))
                            }
                            None => renderer.print_info("System prompt: (none)"),
                        },
                        ChatCommand::Plan(request) => {
                            renderer.print_info("Requesting a weekly exercise plan...");
                            send(&mut session, &mut renderer, &current_turn, &request.to_prompt())
                                .await;
                        }
                        ChatCommand::Transcript => {
                            if session.all().is_empty() {
                                renderer.print_info("(no messages yet)");
                            }
                            for message in session.all() {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the server
                send(&mut session, &mut renderer, &current_turn, line).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one turn with its own cancellation token, then retires the token.
async fn send(
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
    current_turn: &Mutex<CancellationToken>,
    text: &str,
) {
    let cancel = CancellationToken::new();
    install_token(current_turn, cancel.clone());
    let result = session.send_message(text, renderer, &cancel).await;
    install_token(current_turn, CancellationToken::new());
    if let Err(err) = result {
        report(renderer, &err);
    }
}

fn install_token(slot: &Mutex<CancellationToken>, token: CancellationToken) {
    match slot.lock() {
        Ok(mut current) => *current = token,
        Err(poisoned) => *poisoned.into_inner() = token,
    }
}

/// Prints an error with its troubleshooting hint.
///
/// Aborts are skipped; the renderer already marked the reply interrupted.
fn report(renderer: &mut dyn Renderer, err: &Error) {
    if err.is_abort() {
        return;
    }
    renderer.print_error(&err.to_string());
    if let Some(hint) = err.hint() {
        renderer.print_hint(&hint);
    }
}

async fn choose_model(session: &mut ChatSession, renderer: &mut dyn Renderer) {
    let models = match session.refresh_models().await {
        Ok(models) => models.to_vec(),
        Err(err) => {
            report(renderer, &err);
            return;
        }
    };
    match preferred_model(&models, PREFERRED_MODEL) {
        Some(model) => session.set_model(model),
        None => renderer.print_info(&format!(
            "No models installed; using {PREFERRED_MODEL}. Run `ollama pull {PREFERRED_MODEL}` first."
        )),
    }
}

async fn list_models(session: &mut ChatSession, renderer: &mut dyn Renderer) {
    let active = session.model().to_string();
    match session.refresh_models().await {
        Ok(models) if models.is_empty() => {
            renderer.print_info("No models installed. Pull one with `ollama pull <model>`.");
        }
        Ok(models) => {
            println!("    Models:");
            for model in models {
                let marker = if *model == active { "*" } else { " " };
                println!("      {marker} {model}");
            }
        }
        Err(err) => report(renderer, &err),
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Server: {}", stats.host);
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Requests: {} ({} failed or cancelled)",
        stats.total_requests, stats.failed_turns
    );
    println!(
        "      Total tokens: {} in / {} out",
        stats.total_prompt_tokens, stats.total_output_tokens
    );
    if let Some(input) = stats.last_turn_prompt_tokens {
        let output = stats.last_turn_output_tokens.unwrap_or(0);
        println!("      Last turn tokens: {input} in / {output} out");
    }
}

fn print_config(session: &ChatSession) {
    let stats = session.stats();
    println!("    Current Configuration:");
    println!("      Server: {}", stats.host);
    println!("      Model: {}", stats.model);
    println!(
        "      Streaming: {}",
        if stats.stream { "on" } else { "off" }
    );
    match stats.history_window {
        Some(window) => println!("      History window: last {window} messages"),
        None => println!("      History window: (whole conversation)"),
    }
    if let Some(prompt) = stats.system_prompt.as_deref() {
        println!("      System prompt: {}", prompt);
    } else {
        println!("      System prompt: (none)");
    }
}
