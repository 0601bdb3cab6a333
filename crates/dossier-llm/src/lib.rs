//! Summarization and embedding provider abstraction with HTTP backends.

pub mod any;
pub mod error;
pub mod gemini;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;
pub mod retry;

pub use error::LlmError;
pub use provider::LlmProvider;
pub use retry::RetryPolicy;
