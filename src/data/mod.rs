//! Quiz sources and result sinks.
//!
//! The engine only sees the [`QuizProvider`] and [`ResultSink`] traits. The
//! implementations here wrap a local JSON file, an in-memory store and the
//! hosted REST backend.

mod dto;
mod error;
mod loader;
mod memory;
mod rest;

use async_trait::async_trait;

use crate::models::{AttemptResult, Quiz};

pub use dto::{decode_quiz_rows, AttemptRow, OptionRow, QuestionRow, QuizFile, QuizRow, RowId};
pub use error::BackendError;
pub use loader::{JsonFileProvider, JsonLinesSink};
pub use memory::MemoryBackend;
pub use rest::{RestBackend, RestConfig};

/// Looks quizzes up by id.
#[async_trait]
pub trait QuizProvider: Send + Sync {
    /// `Ok(None)` when no quiz has that id.
    async fn get_quiz_by_id(&self, id: &str) -> Result<Option<Quiz>, BackendError>;
}

/// Stores finished attempts. Best-effort: callers log failures and move on.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn submit_attempt_result(&self, result: &AttemptResult) -> Result<(), BackendError>;
}
