//! Hands finished attempts to result persistence.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::data::ResultSink;
use crate::models::{Attempt, AttemptResult, Participant, Quiz};

/// Receives each finished attempt exactly once. Must not block or fail.
pub trait Report {
    fn report(&self, result: AttemptResult);
}

impl<F> Report for F
where
    F: Fn(AttemptResult),
{
    fn report(&self, result: AttemptResult) {
        self(result)
    }
}

pub fn build_result(
    quiz: &Quiz,
    attempt: &Attempt,
    participant: &Participant,
    completed_at: DateTime<Utc>,
) -> AttemptResult {
    AttemptResult {
        participant: participant.clone(),
        quiz_id: quiz.id.clone(),
        score: attempt.score,
        total_questions: u32::try_from(quiz.total_questions()).unwrap_or(u32::MAX),
        completed_at,
    }
}

/// Submit a result, logging the outcome. Returns whether it was stored.
pub async fn submit(sink: &dyn ResultSink, result: &AttemptResult) -> bool {
    match sink.submit_attempt_result(result).await {
        Ok(()) => {
            tracing::info!(
                quiz_id = %result.quiz_id,
                participant = result.participant.label(),
                score = result.score,
                total = result.total_questions,
                "attempt result submitted"
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                quiz_id = %result.quiz_id,
                participant = result.participant.label(),
                "failed to submit attempt result: {}",
                e
            );
            false
        }
    }
}

/// Fire-and-forget reporter: each result is submitted on its own tokio task,
/// which owns the result until the sink has answered. Call
/// [`SpawnReporter::flush`] before the runtime shuts down.
#[derive(Clone)]
pub struct SpawnReporter {
    sink: Arc<dyn ResultSink>,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SpawnReporter {
    pub fn new(sink: Arc<dyn ResultSink>) -> Self {
        Self {
            sink,
            in_flight: Arc::default(),
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of submissions that have not completed yet.
    pub fn pending(&self) -> usize {
        self.lock_in_flight().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait up to `within` for outstanding submissions. Any still running
    /// after that are aborted and logged. Returns how many were abandoned.
    pub async fn flush(&self, within: Duration) -> usize {
        let handles = std::mem::take(&mut *self.lock_in_flight());
        let deadline = tokio::time::Instant::now() + within;

        let mut abandoned = 0;
        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                abandoned += 1;
            }
        }

        if abandoned > 0 {
            tracing::warn!(
                abandoned,
                timeout_ms = within.as_millis() as u64,
                "attempt result submission did not finish before shutdown"
            );
        }
        abandoned
    }
}

impl Report for SpawnReporter {
    fn report(&self, result: AttemptResult) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(quiz_id = %result.quiz_id, "no async runtime; attempt result dropped");
            return;
        };

        let sink = Arc::clone(&self.sink);
        let handle = runtime.spawn(async move {
            submit(sink.as_ref(), &result).await;
        });

        let mut in_flight = self.lock_in_flight();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }
}
