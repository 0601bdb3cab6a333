//! SQLite-backed persistence for indexed source files and summarized commits.

pub mod error;
pub mod sqlite;
pub mod types;

pub use error::StoreError;
pub use sqlite::SqliteStore;
pub use types::{CommitRecord, ProjectId, SourceFileRow};
