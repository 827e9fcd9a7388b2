// Public modules
pub mod chat_request;
pub mod chat_response;
pub mod message;
pub mod model_list;
pub mod usage;

// Re-exports
pub use chat_request::ChatRequest;
pub use chat_response::{ChatCompletion, ChatResponse};
pub use message::{Message, MessageRole};
pub use model_list::{HostStatus, ModelInfo, ModelList};
pub use usage::Usage;
