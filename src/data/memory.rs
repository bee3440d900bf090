use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{AttemptResult, Quiz};

use super::{BackendError, QuizProvider, ResultSink};

/// Keeps quizzes and submitted results in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    quizzes: HashMap<String, Quiz>,
    results: Mutex<Vec<AttemptResult>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quizzes(quizzes: impl IntoIterator<Item = Quiz>) -> Self {
        Self {
            quizzes: quizzes.into_iter().map(|q| (q.id.clone(), q)).collect(),
            results: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything submitted so far.
    pub fn results(&self) -> Vec<AttemptResult> {
        self.results
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl QuizProvider for MemoryBackend {
    async fn get_quiz_by_id(&self, id: &str) -> Result<Option<Quiz>, BackendError> {
        Ok(self.quizzes.get(id).cloned())
    }
}

#[async_trait]
impl ResultSink for MemoryBackend {
    async fn submit_attempt_result(&self, result: &AttemptResult) -> Result<(), BackendError> {
        self.results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(result.clone());
        Ok(())
    }
}
