use crate::engine::{Phase, QuizSession, Report, Scheduler, Wakeup};
use crate::models::{AnswerRecord, Question, Quiz};

/// Terminal player state around a quiz session.
///
/// The quiz is fetched before the player starts and held back until the
/// welcome screen is dismissed, so the first countdown starts on Enter.
pub struct App<S: Scheduler, R: Report> {
    session: QuizSession<S, R>,
    pending_quiz: Option<Quiz>,
    selected_option: usize,
    result_scroll: usize,
}

impl<S: Scheduler, R: Report> App<S, R> {
    /// A `None` quiz goes straight to the unavailable screen.
    pub fn new(mut session: QuizSession<S, R>, quiz: Option<Quiz>) -> Self {
        let pending_quiz = match quiz {
            Some(quiz) if !quiz.is_empty() => Some(quiz),
            other => {
                session.load(other);
                None
            }
        };

        Self {
            session,
            pending_quiz,
            selected_option: 0,
            result_scroll: 0,
        }
    }

    pub fn session(&self) -> &QuizSession<S, R> {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Quiz shown on the welcome screen, before the attempt starts.
    pub fn pending_quiz(&self) -> Option<&Quiz> {
        self.pending_quiz.as_ref()
    }

    pub fn is_welcome(&self) -> bool {
        self.pending_quiz.is_some()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.current_question()
    }

    pub fn current_question_number(&self) -> usize {
        self.session.attempt().question_index + 1
    }

    pub fn total_questions(&self) -> usize {
        self.session.total_questions()
    }

    pub fn selected_option(&self) -> usize {
        self.selected_option
    }

    /// Answer recorded for the question on screen, once locked.
    pub fn current_answer(&self) -> Option<&AnswerRecord> {
        self.session.attempt().current_answer()
    }

    pub fn result_scroll(&self) -> usize {
        self.result_scroll
    }

    pub fn start_quiz(&mut self) {
        if let Some(quiz) = self.pending_quiz.take() {
            self.selected_option = 0;
            self.session.load(Some(quiz));
        }
    }

    fn option_count(&self) -> usize {
        self.current_question().map_or(0, |q| q.options.len())
    }

    pub fn select_next_option(&mut self) {
        let count = self.option_count();
        if count > 0 {
            self.selected_option = (self.selected_option + 1) % count;
        }
    }

    pub fn select_previous_option(&mut self) {
        let count = self.option_count();
        if count > 0 {
            self.selected_option = (self.selected_option + count - 1) % count;
        }
    }

    /// Choose the option under the cursor.
    pub fn submit_answer(&mut self) {
        self.submit_option(self.selected_option);
    }

    /// Choose an option by its position on screen.
    pub fn submit_option(&mut self, position: usize) {
        let Some(option_id) = self
            .current_question()
            .and_then(|q| q.options.get(position))
            .map(|o| o.id.clone())
        else {
            return;
        };

        self.selected_option = position;
        self.session.select(&option_id);
    }

    pub fn on_wakeup(&mut self, wakeup: Wakeup) {
        let index = self.session.attempt().question_index;
        self.session.on_wakeup(wakeup);
        if self.session.attempt().question_index != index {
            self.selected_option = 0;
        }
    }

    pub fn scroll_results_down(&mut self) {
        let max_scroll = self.total_questions().saturating_sub(1);
        self.result_scroll = (self.result_scroll + 1).min(max_scroll);
    }

    pub fn scroll_results_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(1);
    }

    /// Stop the session; nothing changes after this.
    pub fn close(&mut self) {
        self.session.close();
    }

    pub fn restart(&mut self) {
        if self.session.restart() {
            self.selected_option = 0;
            self.result_scroll = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::{SessionSettings, VirtualClock};
    use crate::models::{AnswerOption, AttemptResult, Participant};

    fn quiz() -> Quiz {
        let question = |id: &str| {
            Question::new(
                id,
                "Pick B",
                vec![
                    AnswerOption::new("a", "A", false),
                    AnswerOption::new("b", "B", true),
                    AnswerOption::new("c", "C", false),
                ],
            )
        };
        Quiz::new("quiz", "Quiz", vec![question("q1"), question("q2")])
    }

    fn app(quiz: Option<Quiz>) -> App<VirtualClock, impl Fn(AttemptResult)> {
        let session = QuizSession::new(
            VirtualClock::new(),
            |_: AttemptResult| {},
            Participant::guest("neo"),
            SessionSettings::default(),
        );
        App::new(session, quiz)
    }

    #[test]
    fn test_welcome_holds_quiz_until_start() {
        let mut app = app(Some(quiz()));
        assert!(app.is_welcome());
        assert_eq!(app.phase(), Phase::Loading);

        app.start_quiz();
        assert!(!app.is_welcome());
        assert_eq!(app.phase(), Phase::AwaitingAnswer);
    }

    #[test]
    fn test_missing_quiz_is_unavailable() {
        let app = app(None);
        assert!(!app.is_welcome());
        assert_eq!(app.phase(), Phase::Empty);
    }

    #[test]
    fn test_cursor_wraps_over_option_count() {
        let mut app = app(Some(quiz()));
        app.start_quiz();

        app.select_previous_option();
        assert_eq!(app.selected_option(), 2);
        app.select_next_option();
        assert_eq!(app.selected_option(), 0);
    }

    #[test]
    fn test_submit_uses_cursor_position() {
        let mut app = app(Some(quiz()));
        app.start_quiz();
        app.select_next_option();
        app.submit_answer();

        assert_eq!(app.phase(), Phase::Locked);
        assert!(app.current_answer().is_some_and(|a| a.correct));
        assert_eq!(app.session().score(), 1);
    }

    #[test]
    fn test_cursor_resets_on_next_question() {
        let mut app = app(Some(quiz()));
        app.start_quiz();
        app.submit_option(2);
        assert_eq!(app.selected_option(), 2);

        let wakeups = app.session().scheduler().advance(Duration::from_secs(3));
        for wakeup in wakeups {
            app.on_wakeup(wakeup);
        }
        assert_eq!(app.current_question_number(), 2);
        assert_eq!(app.selected_option(), 0);
    }
}
