use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::fragment_stream::{ChatReply, FragmentStream};
use crate::ndjson::process_ndjson;
use crate::observability::{
    CLIENT_PROBES, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS,
};
use crate::types::{ChatCompletion, ChatRequest, ChatResponse, HostStatus, Message, ModelList};
use crate::ClientLogger;

/// Address of a stock local Ollama install.
pub const DEFAULT_HOST: &str = "http://localhost:11434";
/// Environment variable that overrides [`DEFAULT_HOST`].
pub const HOST_ENV_VAR: &str = "OLLAMA_HOST";
/// Model picked when the server offers it, or when nothing can be listed.
pub const PREFERRED_MODEL: &str = "gemma3:1b";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Client for the Ollama chat API.
///
/// A client is bound to one server address.  Chat calls have no overall
/// timeout, since generation on a slow machine can take minutes; only the
/// connect phase is bounded.
#[derive(Clone)]
pub struct OllamaClient {
    client: ReqwestClient,
    base_url: String,
    connect_timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl OllamaClient {
    /// Create a new Ollama client.
    ///
    /// The server address is read from the OLLAMA_HOST environment variable,
    /// falling back to `http://localhost:11434`.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        base_url: Option<String>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => host_from_env(),
        };
        let base_url = normalize_base_url(&base_url)?;

        let connect_timeout = connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            connect_timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every request, response and stream chunk.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// A copy of this client bound to another server address.
    ///
    /// The connect timeout and logger carry over.
    pub fn rebind(&self, base_url: &str) -> Result<Self> {
        let mut client =
            Self::with_options(Some(base_url.to_string()), Some(self.connect_timeout))?;
        client.logger = self.logger.clone();
        Ok(client)
    }

    /// The normalized server address, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Sends a prepared request, mapping transport failures onto our errors.
    async fn execute(
        &self,
        request: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                let duration = timeout.unwrap_or(self.connect_timeout);
                Error::timeout(
                    format!("Request timed out: {}", e),
                    Some(duration.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
            } else if e.is_builder() {
                Error::url(format!("Invalid request URL: {}", e), None)
            } else {
                Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
            }
        })
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response, model: &str) -> Error {
        let status_code = response.status().as_u16();

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let error_message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or(error_body);

        Error::from_server(status_code, model, error_message)
    }

    /// Posts a chat request and checks the status line.
    async fn post_chat(&self, request: &ChatRequest) -> Result<Response> {
        request.validate()?;
        if let Some(logger) = &self.logger {
            logger.log_request(request);
        }
        tracing::debug!(
            base_url = %self.base_url,
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "posting chat request"
        );

        let mut headers = self.default_headers();
        if request.stream {
            headers.insert(
                header::ACCEPT,
                HeaderValue::from_static(NDJSON_CONTENT_TYPE),
            );
        }

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self
            .execute(
                self.client
                    .post(self.endpoint("api/chat"))
                    .headers(headers)
                    .json(request),
                None,
            )
            .await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::debug!(error = %err, "chat request failed");
                return Err(err);
            }
        };

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response, &request.model).await;
            tracing::debug!(error = %err, "chat request rejected");
            return Err(err);
        }
        Ok(response)
    }

    /// Send the conversation and get the complete reply in one piece.
    pub async fn chat(&self, history: &[Message], model: &str) -> Result<ChatCompletion> {
        let request = ChatRequest::new(model, history.to_vec(), false);
        let response = self.post_chat(&request).await?;

        let mut response = response.json::<ChatResponse>().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        if let Some(logger) = &self.logger {
            logger.log_response(&response);
        }
        if let Some(message) = response.error.take() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Error::from_server(500, model, message));
        }

        Ok(ChatCompletion {
            text: response.text().to_string(),
            usage: response.usage,
        })
    }

    /// Send the conversation and get the reply as a stream of text fragments.
    pub async fn chat_stream(&self, history: &[Message], model: &str) -> Result<FragmentStream> {
        let request = ChatRequest::new(model, history.to_vec(), true);
        let response = self.post_chat(&request).await?;

        let chunks = process_ndjson(response.bytes_stream());
        Ok(FragmentStream::new(chunks, model).with_logger(self.logger.clone()))
    }

    /// Send the conversation in the requested mode.
    ///
    /// The server is never asked twice; a failure is returned as-is.
    pub async fn send(&self, history: &[Message], model: &str, stream: bool) -> Result<ChatReply> {
        if stream {
            Ok(ChatReply::Streaming(self.chat_stream(history, model).await?))
        } else {
            Ok(ChatReply::Complete(self.chat(history, model).await?))
        }
    }

    /// List the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        CLIENT_PROBES.click();
        let response = self
            .execute(
                self.client
                    .get(self.endpoint("v1/models"))
                    .headers(self.default_headers())
                    .timeout(PROBE_TIMEOUT),
                Some(PROBE_TIMEOUT),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), body));
        }

        let list = response.json::<ModelList>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse model list: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(list.ids())
    }

    /// Probe the server root to see whether anything answers there.
    ///
    /// Any HTTP status counts as reachable; only transport failures are
    /// errors.
    pub async fn check_host(&self) -> Result<HostStatus> {
        CLIENT_PROBES.click();
        let response = self
            .execute(
                self.client.get(&self.base_url).timeout(PROBE_TIMEOUT),
                Some(PROBE_TIMEOUT),
            )
            .await?;
        Ok(HostStatus {
            status_code: response.status().as_u16(),
        })
    }
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("connect_timeout", &self.connect_timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// The server address from OLLAMA_HOST, or the default.
pub fn host_from_env() -> String {
    env::var(HOST_ENV_VAR)
        .ok()
        .filter(|host| !host.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

/// Validates a server address and brings it into canonical form.
///
/// A bare `host:port`, as Ollama itself accepts in OLLAMA_HOST, gets an
/// `http://` scheme.  Trailing slashes are dropped so paths can be appended.
pub fn normalize_base_url(host: &str) -> Result<String> {
    let host = host.trim();
    if host.is_empty() {
        return Err(Error::url("server address is empty", None));
    }
    let candidate = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };
    let url = Url::parse(&candidate)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::url(
            format!("unsupported scheme '{}' in {host}", url.scheme()),
            None,
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::url(format!("no host in {host}"), None));
    }
    Ok(candidate.trim_end_matches('/').to_string())
}

/// Picks the model to use from what the server offers.
///
/// Returns `preferred` if it is available, otherwise the first available
/// model, otherwise `None`.
pub fn preferred_model(available: &[String], preferred: &str) -> Option<String> {
    available
        .iter()
        .find(|model| model.as_str() == preferred)
        .or_else(|| available.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client =
            OllamaClient::with_options(Some("http://127.0.0.1:11434/".to_string()), None).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:11434");
        assert_eq!(client.connect_timeout, DEFAULT_CONNECT_TIMEOUT);

        let client = OllamaClient::with_options(
            Some("https://ollama.example.com".to_string()),
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://ollama.example.com");
        assert_eq!(client.connect_timeout, Duration::from_secs(2));
        assert_eq!(
            client.endpoint("api/chat"),
            "https://ollama.example.com/api/chat"
        );
    }

    #[test]
    fn rebind_keeps_settings() {
        let client = OllamaClient::with_options(
            Some("http://127.0.0.1:11434".to_string()),
            Some(Duration::from_secs(4)),
        )
        .unwrap()
        .with_logger(Arc::new(crate::TracingClientLogger));
        let moved = client.rebind("gpu-box:11434").unwrap();
        assert_eq!(moved.base_url(), "http://gpu-box:11434");
        assert_eq!(moved.connect_timeout, Duration::from_secs(4));
        assert!(moved.logger.is_some());
        assert!(client.rebind("ftp://nope").unwrap_err().is_url());
    }

    #[test]
    fn bare_host_port_gets_scheme() {
        assert_eq!(
            normalize_base_url("127.0.0.1:11434").unwrap(),
            "http://127.0.0.1:11434"
        );
        assert_eq!(
            normalize_base_url("  localhost:11434/  ").unwrap(),
            "http://localhost:11434"
        );
    }

    #[test]
    fn invalid_addresses_are_rejected() {
        assert!(normalize_base_url("").unwrap_err().is_url());
        assert!(normalize_base_url("ftp://example.com").unwrap_err().is_url());
        assert!(normalize_base_url("http://").unwrap_err().is_url());
        assert!(
            OllamaClient::with_options(Some("http://exa mple.com".to_string()), None)
                .unwrap_err()
                .is_url()
        );
    }

    #[test]
    fn preferred_model_selection() {
        let available = vec!["llama3:8b".to_string(), "gemma3:1b".to_string()];
        assert_eq!(
            preferred_model(&available, PREFERRED_MODEL).as_deref(),
            Some("gemma3:1b")
        );

        let available = vec!["llama3:8b".to_string(), "qwen2:7b".to_string()];
        assert_eq!(
            preferred_model(&available, PREFERRED_MODEL).as_deref(),
            Some("llama3:8b")
        );

        assert_eq!(preferred_model(&[], PREFERRED_MODEL), None);
    }

    #[tokio::test]
    async fn validation_happens_before_network() {
        // Port 9 on localhost is never contacted; validation fails first.
        let client =
            OllamaClient::with_options(Some("http://127.0.0.1:9".to_string()), None).unwrap();
        let err = client.chat(&[], PREFERRED_MODEL).await.unwrap_err();
        assert!(err.is_validation());
        let err = client
            .chat_stream(&[Message::system("only system")], PREFERRED_MODEL)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
