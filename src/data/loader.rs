use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::{AttemptResult, Quiz};

use super::{AttemptRow, BackendError, QuizFile, QuizProvider, ResultSink};

/// Decode a quiz file holding one quiz object or an array of them.
fn parse_quiz_file(content: &str) -> Result<Vec<Quiz>, BackendError> {
    let file: QuizFile = serde_json::from_str(content)?;
    file.into_rows().into_iter().map(Quiz::try_from).collect()
}

/// Serves quizzes from a JSON file, re-read on every lookup so edits show up
/// without a restart.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuizProvider for JsonFileProvider {
    async fn get_quiz_by_id(&self, id: &str) -> Result<Option<Quiz>, BackendError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let quizzes = parse_quiz_file(&content)?;
        Ok(quizzes.into_iter().find(|quiz| quiz.id == id))
    }
}

/// Appends each result as one JSON line.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    // Serializes appends from concurrently spawned reports.
    lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ResultSink for JsonLinesSink {
    async fn submit_attempt_result(&self, result: &AttemptResult) -> Result<(), BackendError> {
        let mut line = serde_json::to_string(&AttemptRow::from(result))?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
