//! Quiz session state machine.
//!
//! ```text
//! Loading ──► Empty
//!    │
//!    ▼
//! AwaitingAnswer ──(select / expiry)──► Locked ──(lock delay)──► AwaitingAnswer
//!                                          │
//!                                          └──(last question)──► Finished
//! ```
//!
//! The session is driven by exactly one owner that feeds it user selections
//! and scheduler wakeups one at a time. Events that do not fit the current
//! phase are ignored.

use std::time::Duration;

use chrono::Utc;

use crate::models::{AnswerRecord, Attempt, AttemptResult, Participant, Question, Quiz};

use super::reporter::{build_result, Report};
use super::scheduler::{Cancel, Scheduler, VirtualClock, Wakeup, WakeupKind};
use super::scoring::evaluate;
use super::timer::{Timer, TimerEvent, DEFAULT_QUESTION_SECS};

/// Pause between locking an answer and moving on.
pub const DEFAULT_LOCK_DELAY: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the quiz to arrive.
    Loading,
    /// Current question is open; the countdown is running.
    AwaitingAnswer,
    /// Current question is answered or timed out; showing correctness.
    Locked,
    /// All questions done, result reported.
    Finished,
    /// Quiz missing, failed to load or has no questions.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub question_secs: u32,
    pub lock_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            question_secs: DEFAULT_QUESTION_SECS,
            lock_delay: DEFAULT_LOCK_DELAY,
        }
    }
}

pub struct QuizSession<S: Scheduler, R: Report> {
    phase: Phase,
    quiz: Option<Quiz>,
    attempt: Attempt,
    participant: Participant,
    settings: SessionSettings,
    timer: Timer<S::Handle>,
    lock_delay: Option<S::Handle>,
    lock_epoch: u64,
    epoch: u64,
    closed: bool,
    last_result: Option<AttemptResult>,
    scheduler: S,
    reporter: R,
}

impl<S: Scheduler, R: Report> QuizSession<S, R> {
    pub fn new(scheduler: S, reporter: R, participant: Participant, settings: SessionSettings) -> Self {
        Self {
            phase: Phase::Loading,
            quiz: None,
            attempt: Attempt::new(0, settings.question_secs),
            participant,
            settings,
            timer: Timer::new(settings.question_secs),
            lock_delay: None,
            lock_epoch: 0,
            epoch: 0,
            closed: false,
            last_result: None,
            scheduler,
            reporter,
        }
    }

    /// Supply the loaded quiz, or `None` when it could not be found or fetched.
    pub fn load(&mut self, quiz: Option<Quiz>) -> Phase {
        if self.closed || self.phase != Phase::Loading {
            tracing::debug!(phase = ?self.phase, "ignoring load outside Loading");
            return self.phase;
        }

        match quiz {
            Some(quiz) if !quiz.is_empty() => {
                tracing::info!(
                    quiz_id = %quiz.id,
                    questions = quiz.total_questions(),
                    answerable = quiz.answerable_count(),
                    "quiz loaded"
                );
                self.quiz = Some(quiz);
                self.begin_attempt();
            }
            Some(quiz) => {
                tracing::info!(quiz_id = %quiz.id, "quiz has no questions");
                self.quiz = Some(quiz);
                self.phase = Phase::Empty;
            }
            None => {
                tracing::info!("quiz unavailable");
                self.phase = Phase::Empty;
            }
        }

        self.phase
    }

    /// Answer the current question. Returns the locked answer, or `None` when
    /// the selection was not accepted.
    pub fn select(&mut self, option_id: &str) -> Option<AnswerRecord> {
        if self.closed || self.phase != Phase::AwaitingAnswer {
            tracing::debug!(phase = ?self.phase, option_id, "ignoring selection");
            return None;
        }

        let known = self
            .current_question()
            .is_some_and(|q| q.option(option_id).is_some());
        if !known {
            tracing::debug!(option_id, "ignoring selection of unknown option");
            return None;
        }

        self.lock_answer(Some(option_id.to_string()))
    }

    /// Deliver a scheduled wakeup. Returns whether it changed anything.
    pub fn on_wakeup(&mut self, wakeup: Wakeup) -> bool {
        if self.closed {
            tracing::debug!(?wakeup, "ignoring wakeup after close");
            return false;
        }

        match (self.phase, wakeup.kind) {
            (Phase::AwaitingAnswer, WakeupKind::Tick) => {
                match self.timer.on_tick(&self.scheduler, wakeup.epoch) {
                    Some(TimerEvent::Tick { remaining_secs }) => {
                        self.attempt.remaining_secs = remaining_secs;
                        true
                    }
                    Some(TimerEvent::Expired) => {
                        self.attempt.remaining_secs = 0;
                        tracing::debug!(question = self.attempt.question_index, "time expired");
                        self.lock_answer(None);
                        true
                    }
                    None => false,
                }
            }
            (Phase::Locked, WakeupKind::LockElapsed) if wakeup.epoch == self.lock_epoch => {
                self.lock_delay = None;
                self.advance_question();
                true
            }
            _ => {
                tracing::debug!(phase = ?self.phase, ?wakeup, "ignoring stale wakeup");
                false
            }
        }
    }

    /// Throw the current attempt away and start over at question 0.
    pub fn restart(&mut self) -> bool {
        if self.closed || matches!(self.phase, Phase::Loading | Phase::Empty) {
            return false;
        }

        tracing::info!(
            previous_score = self.attempt.score,
            previous_phase = ?self.phase,
            "restarting attempt"
        );
        self.cancel_pending();
        self.last_result = None;
        self.begin_attempt();
        true
    }

    /// Tear the session down: cancel every pending wakeup and refuse all
    /// further input. The phase is left as it was for display.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.cancel_pending();
        self.epoch += 1;
        self.lock_epoch = 0;
        self.closed = true;
        tracing::debug!(phase = ?self.phase, "session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.as_ref()?.questions.get(self.attempt.question_index)
    }

    pub fn score(&self) -> u32 {
        self.attempt.score
    }

    pub fn remaining_secs(&self) -> u32 {
        self.attempt.remaining_secs
    }

    pub fn total_questions(&self) -> usize {
        self.quiz.as_ref().map_or(0, Quiz::total_questions)
    }

    /// The result built when the attempt finished.
    pub fn result(&self) -> Option<&AttemptResult> {
        self.last_result.as_ref()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn begin_attempt(&mut self) {
        self.attempt = Attempt::new(self.total_questions(), self.settings.question_secs);
        self.open_question();
    }

    fn open_question(&mut self) {
        let epoch = self.next_epoch();
        self.attempt.remaining_secs = self.settings.question_secs;
        self.timer.start(&self.scheduler, epoch);
        self.phase = Phase::AwaitingAnswer;
    }

    fn lock_answer(&mut self, selected: Option<String>) -> Option<AnswerRecord> {
        let index = self.attempt.question_index;
        if self.attempt.is_answered(index) {
            return None;
        }

        let question = self.current_question()?;
        let evaluation = evaluate(question, selected.as_deref());

        self.timer.cancel();
        let record = AnswerRecord {
            question_index: index,
            selected_option: selected,
            correct: evaluation.correct,
        };
        self.attempt.score += evaluation.points;
        self.attempt.answers[index] = Some(record.clone());

        let epoch = self.next_epoch();
        self.lock_epoch = epoch;
        self.lock_delay = Some(
            self.scheduler
                .schedule_once(self.settings.lock_delay, Wakeup::lock_elapsed(epoch)),
        );
        self.phase = Phase::Locked;

        tracing::debug!(
            question = index,
            correct = record.correct,
            timed_out = record.timed_out(),
            score = self.attempt.score,
            "answer locked"
        );
        Some(record)
    }

    fn advance_question(&mut self) {
        if self.attempt.question_index + 1 < self.total_questions() {
            self.attempt.question_index += 1;
            self.open_question();
        } else {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
        let Some(quiz) = self.quiz.as_ref() else {
            return;
        };

        let result = build_result(quiz, &self.attempt, &self.participant, Utc::now());
        tracing::info!(
            quiz_id = %result.quiz_id,
            score = result.score,
            total = result.total_questions,
            "attempt finished"
        );
        self.last_result = Some(result.clone());
        self.reporter.report(result);
    }

    fn cancel_pending(&mut self) {
        self.timer.cancel();
        if let Some(mut handle) = self.lock_delay.take() {
            handle.cancel();
        }
    }
}

impl<R: Report> QuizSession<VirtualClock, R> {
    /// Move virtual time forward, delivering every wakeup that falls due,
    /// including ones scheduled along the way.
    pub fn advance(&mut self, by: Duration) {
        let until = self.scheduler.now() + by;
        while let Some(wakeup) = self.scheduler.pop_due(until) {
            self.on_wakeup(wakeup);
        }
        self.scheduler.set_now(until);
    }
}

impl<S: Scheduler, R: Report> Drop for QuizSession<S, R> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::models::AnswerOption;

    type Reports = Rc<RefCell<Vec<AttemptResult>>>;

    fn quiz(correct: &[&str]) -> Quiz {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, right)| {
                Question::new(
                    format!("q{}", i),
                    format!("Question {}", i),
                    ["A", "B", "C"]
                        .iter()
                        .map(|id| AnswerOption::new(*id, id.to_lowercase(), id == right))
                        .collect(),
                )
            })
            .collect();
        Quiz::new("quiz", "Test quiz", questions)
    }

    fn session() -> (QuizSession<VirtualClock, impl Fn(AttemptResult)>, Reports) {
        let reports: Reports = Rc::default();
        let sink = Rc::clone(&reports);
        let session = QuizSession::new(
            VirtualClock::new(),
            move |result: AttemptResult| sink.borrow_mut().push(result),
            Participant::guest("neo"),
            SessionSettings::default(),
        );
        (session, reports)
    }

    #[test]
    fn test_load_starts_first_question() {
        let (mut session, _) = session();
        assert_eq!(session.phase(), Phase::Loading);
        assert_eq!(session.load(Some(quiz(&["A"]))), Phase::AwaitingAnswer);
        assert_eq!(session.attempt().question_index, 0);
        assert_eq!(session.remaining_secs(), 30);
        assert_eq!(session.scheduler().pending(), 1);
    }

    #[test]
    fn test_load_missing_quiz_is_empty() {
        let (mut session, reports) = session();
        assert_eq!(session.load(None), Phase::Empty);
        assert!(session.select("A").is_none());
        assert!(!session.restart());
        assert!(reports.borrow().is_empty());
    }

    #[test]
    fn test_ticks_update_remaining_time() {
        let (mut session, _) = session();
        session.load(Some(quiz(&["A"])));
        session.advance(Duration::from_secs(10));
        assert_eq!(session.remaining_secs(), 20);
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
    }

    #[test]
    fn test_selection_locks_and_scores() {
        let (mut session, _) = session();
        session.load(Some(quiz(&["B", "A"])));

        let record = session.select("B").unwrap();
        assert!(record.correct);
        assert_eq!(session.phase(), Phase::Locked);
        assert_eq!(session.score(), 1);
        // Only the lock delay is pending; the countdown was cancelled.
        assert_eq!(session.scheduler().pending(), 1);
    }

    #[test]
    fn test_locked_ignores_further_selections() {
        let (mut session, _) = session();
        session.load(Some(quiz(&["A", "A"])));

        session.select("B");
        assert!(session.select("A").is_none());
        assert!(session.select("A").is_none());
        assert_eq!(session.score(), 0);
        assert!(!session.attempt().answers[0].as_ref().unwrap().correct);
    }

    #[test]
    fn test_unknown_option_is_ignored() {
        let (mut session, _) = session();
        session.load(Some(quiz(&["A"])));
        assert!(session.select("Z").is_none());
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
    }

    #[test]
    fn test_lock_delay_advances_to_next_question() {
        let (mut session, _) = session();
        session.load(Some(quiz(&["A", "B"])));
        session.select("A");

        session.advance(Duration::from_millis(2499));
        assert_eq!(session.phase(), Phase::Locked);

        session.advance(Duration::from_millis(1));
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
        assert_eq!(session.attempt().question_index, 1);
        assert_eq!(session.remaining_secs(), 30);
    }

    #[test]
    fn test_last_question_waits_before_finishing() {
        let (mut session, reports) = session();
        session.load(Some(quiz(&["A"])));
        session.select("A");

        session.advance(Duration::from_secs(1));
        assert_eq!(session.phase(), Phase::Locked);
        assert!(reports.borrow().is_empty());

        session.advance(Duration::from_secs(2));
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(reports.borrow().len(), 1);
        assert_eq!(session.result().map(|r| r.score), Some(1));
    }

    #[test]
    fn test_stale_wakeups_are_ignored() {
        let (mut session, _) = session();
        session.load(Some(quiz(&["A", "B"])));
        session.select("A");

        // Tick from the cancelled countdown of question 0.
        assert!(!session.on_wakeup(Wakeup::tick(1)));
        assert!(!session.on_wakeup(Wakeup::lock_elapsed(999)));
        assert_eq!(session.phase(), Phase::Locked);
    }

    #[test]
    fn test_close_cancels_pending_wakeups() {
        let (mut session, reports) = session();
        session.load(Some(quiz(&["A"])));
        session.select("A");
        session.close();

        assert_eq!(session.scheduler().pending(), 0);
        session.advance(Duration::from_secs(60));
        assert_eq!(session.phase(), Phase::Locked);
        assert!(reports.borrow().is_empty());
    }

    #[test]
    fn test_closed_session_rejects_input() {
        let (mut session, reports) = session();
        session.load(Some(quiz(&["A"])));
        session.close();

        assert!(session.is_closed());
        assert!(session.select("A").is_none());
        assert!(!session.on_wakeup(Wakeup::tick(1)));
        assert!(!session.restart());
        session.advance(Duration::from_secs(60));

        assert_eq!(session.phase(), Phase::AwaitingAnswer);
        assert_eq!(session.attempt().answered_count(), 0);
        assert_eq!(session.scheduler().pending(), 0);
        assert!(session.result().is_none());
        assert!(reports.borrow().is_empty());
    }

    #[test]
    fn test_drop_cancels_pending_wakeups() {
        let clock = VirtualClock::new();
        {
            let mut session = QuizSession::new(
                clock.clone(),
                |_: AttemptResult| {},
                Participant::guest("neo"),
                SessionSettings::default(),
            );
            session.load(Some(quiz(&["A"])));
            assert_eq!(clock.pending(), 1);
        }
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_restart_mid_attempt() {
        let (mut session, reports) = session();
        session.load(Some(quiz(&["A", "B"])));
        session.select("A");
        session.advance(Duration::from_secs(3));
        session.advance(Duration::from_secs(5));

        assert!(session.restart());
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
        assert_eq!(session.score(), 0);
        assert_eq!(session.attempt().question_index, 0);
        assert_eq!(session.attempt().answered_count(), 0);
        assert_eq!(session.remaining_secs(), 30);
        assert_eq!(session.scheduler().pending(), 1);
        assert!(reports.borrow().is_empty());
    }

    #[test]
    fn test_custom_settings() {
        let settings = SessionSettings {
            question_secs: 5,
            lock_delay: Duration::from_millis(100),
        };
        let mut session = QuizSession::new(
            VirtualClock::new(),
            |_: AttemptResult| {},
            Participant::guest("neo"),
            settings,
        );
        session.load(Some(quiz(&["A"])));

        session.advance(Duration::from_secs(5));
        assert_eq!(session.phase(), Phase::Locked);
        session.advance(Duration::from_millis(100));
        assert_eq!(session.phase(), Phase::Finished);
    }
}
