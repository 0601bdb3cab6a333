//! Repository indexing and commit summarization.
//!
//! Two pipelines share one shape: fetch from the repository host, diff against
//! what is already stored, summarize and embed through the LLM provider, then
//! persist. Per-item failures degrade to placeholder values instead of aborting
//! the batch; only the initial listing call is fatal.

pub mod document;
pub mod error;
pub mod generator;
pub mod host;
pub mod indexer;
pub mod poller;
pub(crate) mod prompt;
pub mod summarizer;

pub use error::{FetchError, IndexError, Result};
