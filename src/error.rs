//! Error types for the ollama-chat crate.
//!
//! Every failure that can surface while talking to an Ollama server is
//! expressed as a variant of [`Error`].  Callers mostly care about two
//! families: connection failures ([`Error::is_connection`]) and capability
//! failures ([`Error::is_capability`]), and [`Error::hint`] turns either into
//! actionable advice for the user.

use std::error;
use std::fmt;
use std::str::Utf8Error;
use std::sync::Arc;

/// The main error type for ollama-chat.
#[derive(Clone, Debug)]
pub enum Error {
    /// A generic API error occurred.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message.
        message: String,
    },

    /// Bad request due to invalid parameters.
    BadRequest {
        /// Human-readable error message.
        message: String,
    },

    /// The requested model is not installed on the server.
    ModelNotFound {
        /// The model identifier that was requested.
        model: String,
        /// Human-readable error message.
        message: String,
    },

    /// The server could not load the model because it ran out of memory.
    InsufficientMemory {
        /// Human-readable error message.
        message: String,
    },

    /// Timed out while contacting the server.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// Request was aborted by the client.
    Abort {
        /// Human-readable error message.
        message: String,
    },

    /// A new turn was submitted while another was still in flight.
    Busy {
        /// Human-readable error message.
        message: String,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Server returned a 500 internal error.
    InternalServer {
        /// Human-readable error message.
        message: String,
    },

    /// Server is overloaded or unavailable.
    ServiceUnavailable {
        /// Human-readable error message.
        message: String,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during validation of request parameters.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// A server address could not be parsed.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// A streaming error occurred.
    Streaming {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Encoding/decoding error.
    Encoding {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new API error.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a new model-not-found error.
    pub fn model_not_found(model: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ModelNotFound {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Creates a new insufficient-memory error.
    pub fn insufficient_memory(message: impl Into<String>) -> Self {
        Error::InsufficientMemory {
            message: message.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new abort error.
    pub fn abort(message: impl Into<String>) -> Self {
        Error::Abort {
            message: message.into(),
        }
    }

    /// Creates a new busy error.
    pub fn busy(message: impl Into<String>) -> Self {
        Error::Busy {
            message: message.into(),
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new internal server error.
    pub fn internal_server(message: impl Into<String>) -> Self {
        Error::InternalServer {
            message: message.into(),
        }
    }

    /// Creates a new service unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Error::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new encoding error.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Maps a server-reported failure onto the matching variant.
    ///
    /// Ollama answers with a status code and a free-form `error` string; the
    /// string is the only place the memory condition shows up.
    pub fn from_server(status_code: u16, model: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if lowered.contains("memory") {
            return Error::insufficient_memory(message);
        }
        if status_code == 404 || (lowered.contains("model") && lowered.contains("not found")) {
            return Error::model_not_found(model, message);
        }
        match status_code {
            400 => Error::bad_request(message),
            408 => Error::timeout(message, None),
            500 => Error::internal_server(message),
            502..=504 => Error::service_unavailable(message),
            _ => Error::api(status_code, message),
        }
    }

    /// Returns true if the server could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. } | Error::Timeout { .. })
    }

    /// Returns true if the server is reachable but cannot serve the model.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            Error::ModelNotFound { .. } | Error::InsufficientMemory { .. }
        )
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is an abort.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort { .. })
    }

    /// Returns true if a turn was rejected because another was in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy { .. })
    }

    /// Returns true if this error is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Error::InternalServer { .. } | Error::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if a server address failed to parse.
    pub fn is_url(&self) -> bool {
        matches!(self, Error::Url { .. })
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Troubleshooting advice for the user, if there is any to give.
    pub fn hint(&self) -> Option<String> {
        match self {
            Error::Connection { .. } => Some(
                "Is Ollama running? Try `ollama serve`, verify host/port, or set OLLAMA_HOST."
                    .to_string(),
            ),
            Error::Timeout { .. } => {
                Some("Connection timed out; check network and host/port.".to_string())
            }
            Error::Url { .. } => {
                Some("Make sure the host starts with http:// or https://.".to_string())
            }
            Error::ModelNotFound { model, .. } => Some(format!(
                "Pull the model with `ollama pull {model}`, then /models to refresh the list."
            )),
            Error::InsufficientMemory { .. } => Some(
                "The model needs more RAM than is available. Use a smaller or quantized model, \
                 add swap, or run Ollama on a machine with more memory or a GPU."
                    .to_string(),
            ),
            Error::Busy { .. } => {
                Some("Wait for the current response to finish, or press Ctrl+C.".to_string())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                message,
            } => {
                write!(f, "API error (HTTP {status_code}): {message}")
            }
            Error::BadRequest { message } => {
                write!(f, "Bad request: {message}")
            }
            Error::ModelNotFound { model, message } => {
                write!(f, "Model not available ({model}): {message}")
            }
            Error::InsufficientMemory { message } => {
                write!(f, "Insufficient memory to run model: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Abort { message } => {
                write!(f, "Request aborted: {message}")
            }
            Error::Busy { message } => {
                write!(f, "Busy: {message}")
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::InternalServer { message } => {
                write!(f, "Internal server error: {message}")
            }
            Error::ServiceUnavailable { message } => {
                write!(f, "Service unavailable: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Streaming { message, .. } => {
                write!(f, "Streaming error: {message}")
            }
            Error::Encoding { message, .. } => {
                write!(f, "Encoding error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            Error::Streaming { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Encoding { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for ollama-chat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_capability_failure() {
        let err = Error::from_server(404, "gemma3:4b", "model \"gemma3:4b\" not found");
        assert!(err.is_capability());
        assert!(!err.is_connection());
        match &err {
            Error::ModelNotFound { model, .. } => assert_eq!(model, "gemma3:4b"),
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(err.hint().unwrap().contains("ollama pull gemma3:4b"));
    }

    #[test]
    fn not_found_text_without_404_still_maps_to_model() {
        let err = Error::from_server(
            500,
            "llama9",
            "model 'llama9' not found, try pulling it first",
        );
        assert!(matches!(err, Error::ModelNotFound { .. }));
    }

    #[test]
    fn memory_errors_are_capability_failures() {
        let err = Error::from_server(
            500,
            "gemma3:4b",
            "model requires more system memory (5.1 GiB) than is available (3.2 GiB)",
        );
        assert!(matches!(err, Error::InsufficientMemory { .. }));
        assert!(err.is_capability());
        assert!(err.hint().unwrap().contains("smaller"));
    }

    #[test]
    fn status_codes_map_to_variants() {
        assert!(matches!(
            Error::from_server(400, "m", "bad"),
            Error::BadRequest { .. }
        ));
        assert!(Error::from_server(500, "m", "boom").is_server_error());
        assert!(Error::from_server(503, "m", "busy").is_server_error());
        let err = Error::from_server(418, "m", "teapot");
        assert_eq!(err.status_code(), Some(418));
        assert_eq!(err.to_string(), "API error (HTTP 418): teapot");
    }

    #[test]
    fn connection_family() {
        assert!(Error::connection("refused", None).is_connection());
        assert!(Error::timeout("slow", Some(3.0)).is_connection());
        assert!(!Error::abort("stop").is_connection());
        assert!(Error::connection("refused", None).hint().is_some());
    }

    #[test]
    fn display_formats() {
        assert_eq!(
            Error::validation("history is empty", Some("history".to_string())).to_string(),
            "Validation error: history is empty (parameter: history)"
        );
        assert_eq!(
            Error::timeout("no answer", Some(3.0)).to_string(),
            "Timeout error: no answer (3 seconds)"
        );
        assert_eq!(
            Error::busy("turn in flight").to_string(),
            "Busy: turn in flight"
        );
    }

    #[test]
    fn url_errors_convert() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = parse_err.into();
        assert!(err.is_url());
        assert!(error::Error::source(&err).is_some());
    }
}
