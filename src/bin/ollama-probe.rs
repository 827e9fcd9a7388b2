//! One-shot diagnostic for an Ollama server.
//!
//! Checks that the server answers, lists its models, picks one, and asks it
//! for a one-word greeting.
//!
//! # Usage
//!
//! ```bash
//! # Probe $OLLAMA_HOST (or http://localhost:11434) with the best available model
//! ollama-probe
//!
//! # Probe a specific model on a specific server
//! ollama-probe --host http://10.0.0.5:11434 llama3:8b
//! ```
//!
//! # Exit Codes
//!
//! - 0: the model answered
//! - 3: the server address is invalid or the server is unreachable
//! - 4: the chat call failed

use std::time::Instant;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use ollama_chat::{Error, Message, OllamaClient, PREFERRED_MODEL, preferred_model};

const GREETING: &str = "Hello, reply with one word.";

/// Command-line arguments for the ollama-probe tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct Args {
    /// Server base address.
    #[arrrg(optional, "Ollama server address (default: $OLLAMA_HOST or http://localhost:11434)", "URL")]
    host: Option<String>,

    /// Stream the reply instead of waiting for it.
    #[arrrg(flag, "Stream the greeting")]
    stream: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = Args::from_command_line_relaxed("ollama-probe [OPTIONS] [MODEL]");

    let client = match OllamaClient::with_options(args.host, None) {
        Ok(client) => client,
        Err(err) => fail("Invalid server address", &err, 3),
    };
    println!("Server: {}", client.base_url());

    match client.check_host().await {
        Ok(status) => println!("{status}"),
        Err(err) => fail("Server unreachable", &err, 3),
    }

    let models = match client.list_models().await {
        Ok(models) => models,
        Err(err) => {
            eprintln!("Could not list models: {err}");
            Vec::new()
        }
    };
    println!("Available models: {}", describe_models(&models));

    let model = free
        .first()
        .cloned()
        .or_else(|| preferred_model(&models, PREFERRED_MODEL))
        .unwrap_or_else(|| PREFERRED_MODEL.to_string());
    println!("Test model: {model}");

    let start = Instant::now();
    let history = [Message::user(GREETING)];
    let reply = match client.send(&history, &model, args.stream).await {
        Ok(reply) => reply,
        Err(err) => fail("Chat call failed", &err, 4),
    };
    let completion = match reply.into_completion().await {
        Ok(completion) => completion,
        Err(err) => fail("Chat call failed", &err, 4),
    };

    println!("Response: {}", completion.text.trim());
    println!(
        "Duration: {:?} ({} prompt tokens, {} generated)",
        start.elapsed(),
        completion.usage.prompt_tokens(),
        completion.usage.output_tokens()
    );
    println!("OK");
    Ok(())
}

fn describe_models(models: &[String]) -> String {
    if models.is_empty() {
        "(none)".to_string()
    } else {
        models.join(", ")
    }
}

fn fail(context: &str, err: &Error, code: i32) -> ! {
    eprintln!("{context}: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("Hint: {hint}");
    }
    std::process::exit(code);
}
