// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod fragment_stream;
pub mod ndjson;
pub mod observability;
pub mod render;
pub mod types;

// Re-exports
pub use client::{
    DEFAULT_HOST, HOST_ENV_VAR, OllamaClient, PREFERRED_MODEL, host_from_env, normalize_base_url,
    preferred_model,
};
pub use client_logger::{ClientLogger, TracingClientLogger};
pub use error::{Error, Result};
pub use fragment_stream::{ChatReply, FragmentStream};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;
