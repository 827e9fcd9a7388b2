//! An in-process stand-in for an Ollama server.
//!
//! Each test starts a [`MockOllama`] on an ephemeral port with a responder
//! closure that decides what every request gets back.  Requests are captured
//! so tests can check exactly what the client sent.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ollama_chat::{Message, Renderer};

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub body: serde_json::Value,
}

impl CapturedRequest {
    /// `(role, content)` pairs of the `messages` array of a chat request.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.body["messages"]
            .as_array()
            .map(|messages| {
                messages
                    .iter()
                    .map(|m| {
                        (
                            m["role"].as_str().unwrap_or_default().to_string(),
                            m["content"].as_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a chat request asked for a stream.
    pub fn wants_stream(&self) -> bool {
        self.body["stream"].as_bool().unwrap_or(false)
    }

    /// The model a chat request named.
    pub fn model(&self) -> String {
        self.body["model"].as_str().unwrap_or_default().to_string()
    }
}

/// What the mock sends back.
pub enum Reply {
    /// A complete response with a length-delimited body.
    Json { status: u16, body: String },
    /// Newline-delimited JSON lines, then the connection closes.
    Ndjson(Vec<String>),
    /// Newline-delimited JSON lines, then the connection hangs open.
    Stall(Vec<String>),
}

type Responder = dyn Fn(&CapturedRequest) -> Reply + Send + Sync;

/// A running mock server.  Dropping it stops accepting connections.
pub struct MockOllama {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    task: JoinHandle<()>,
}

impl MockOllama {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&CapturedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("local addr should resolve");
        let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let captured = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let captured = Arc::clone(&captured);
                let responder = Arc::clone(&responder);
                tokio::spawn(async move {
                    let _ = serve(stream, captured, responder).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            task,
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Only the chat requests.
    pub fn chat_requests(&self) -> Vec<CapturedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == "/api/chat")
            .collect()
    }
}

impl Drop for MockOllama {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// An address nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    drop(listener);
    format!("http://{addr}")
}

async fn serve(
    mut stream: TcpStream,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    responder: Arc<Responder>,
) -> Result<(), String> {
    let request = read_http_request(&mut stream).await?;
    captured.lock().unwrap().push(request.clone());

    match (*responder)(&request) {
        Reply::Json { status, body } => {
            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                reason(status),
                body.len()
            );
            write_all(&mut stream, response.as_bytes()).await?;
        }
        Reply::Ndjson(lines) => {
            write_stream_head(&mut stream).await?;
            for line in lines {
                write_all(&mut stream, format!("{line}\n").as_bytes()).await?;
            }
        }
        Reply::Stall(lines) => {
            write_stream_head(&mut stream).await?;
            for line in lines {
                write_all(&mut stream, format!("{line}\n").as_bytes()).await?;
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    }
    let _ = stream.shutdown().await;
    Ok(())
}

async fn write_stream_head(stream: &mut TcpStream) -> Result<(), String> {
    write_all(
        stream,
        b"HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n",
    )
    .await
}

async fn write_all(stream: &mut TcpStream, bytes: &[u8]) -> Result<(), String> {
    stream.write_all(bytes).await.map_err(|err| err.to_string())?;
    stream.flush().await.map_err(|err| err.to_string())
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn read_http_request(stream: &mut TcpStream) -> Result<CapturedRequest, String> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.expect("header end should exist");
    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing HTTP request line".to_string())?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0_usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse::<usize>().map_err(|err| err.to_string())?;
        }
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    let body = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|err| err.to_string())?
    };
    Ok(CapturedRequest { method, path, body })
}

/// A complete `/api/chat` response body.
pub fn chat_body(model: &str, text: &str) -> String {
    serde_json::json!({
        "model": model,
        "created_at": "2025-01-01T00:00:00Z",
        "message": {"role": "assistant", "content": text},
        "done": true,
        "done_reason": "stop",
        "total_duration": 1_200_000_u64,
        "prompt_eval_count": 8,
        "eval_count": 5
    })
    .to_string()
}

/// Streamed `/api/chat` lines: one per fragment, then the done marker.
pub fn stream_lines(model: &str, fragments: &[&str]) -> Vec<String> {
    let mut lines: Vec<String> = fragments.iter().map(|f| fragment_line(model, f)).collect();
    lines.push(
        serde_json::json!({
            "model": model,
            "created_at": "2025-01-01T00:00:01Z",
            "message": {"role": "assistant", "content": ""},
            "done": true,
            "done_reason": "stop",
            "total_duration": 1_200_000_u64,
            "prompt_eval_count": 8,
            "eval_count": fragments.len()
        })
        .to_string(),
    );
    lines
}

/// One intermediate streamed line.
pub fn fragment_line(model: &str, text: &str) -> String {
    serde_json::json!({
        "model": model,
        "created_at": "2025-01-01T00:00:00Z",
        "message": {"role": "assistant", "content": text},
        "done": false
    })
    .to_string()
}

/// An `{"error": ...}` body.
pub fn error_body(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Answers every chat request with `text`, streamed or whole as asked.
pub fn echo_responder(text: &'static str) -> impl Fn(&CapturedRequest) -> Reply + Send + Sync {
    move |request| {
        let model = request.model();
        if request.wants_stream() {
            let fragments: Vec<&str> = text.split_inclusive(' ').collect();
            Reply::Ndjson(stream_lines(&model, &fragments))
        } else {
            Reply::Json {
                status: 200,
                body: chat_body(&model, text),
            }
        }
    }
}

/// A renderer that records what it was asked to show.
#[derive(Default)]
pub struct RecordingRenderer {
    pub starts: usize,
    pub fragments: Vec<String>,
    pub finishes: usize,
    pub interrupted: usize,
    pub errors: Vec<String>,
    pub info: Vec<String>,
    pub cancel_on_first_text: Option<CancellationToken>,
}

impl RecordingRenderer {
    pub fn cancelling(token: CancellationToken) -> Self {
        Self {
            cancel_on_first_text: Some(token),
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

impl Renderer for RecordingRenderer {
    fn start_response(&mut self) {
        self.starts += 1;
    }

    fn print_text(&mut self, text: &str) {
        self.fragments.push(text.to_string());
        if let Some(token) = self.cancel_on_first_text.take() {
            token.cancel();
        }
    }

    fn finish_response(&mut self) {
        self.finishes += 1;
    }

    fn print_interrupted(&mut self) {
        self.interrupted += 1;
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_hint(&mut self, _hint: &str) {}

    fn print_info(&mut self, info: &str) {
        self.info.push(info.to_string());
    }

    fn print_success(&mut self, message: &str) {
        self.info.push(message.to_string());
    }

    fn print_message(&mut self, message: &Message) {
        self.info.push(format!("{}: {}", message.role(), message.content()));
    }
}
