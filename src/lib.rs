//! # quizline
//!
//! Timed quiz-taking engine with a terminal player, result reporting to a
//! hosted backend, AI question generation and PIN-based live sessions.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quizline::data::{JsonFileProvider, MemoryBackend};
//! use quizline::engine::SessionSettings;
//! use quizline::models::Participant;
//! use quizline::{Player, QuizError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), QuizError> {
//!     let provider = JsonFileProvider::new("quizzes.json");
//!     let sink = Arc::new(MemoryBackend::new());
//!
//!     let player = Player::load(
//!         &provider,
//!         sink,
//!         "ownership",
//!         Participant::guest("ferris"),
//!         SessionSettings::default(),
//!     )
//!     .await;
//!     player.run().await
//! }
//! ```

mod app;
pub mod config;
pub mod data;
pub mod engine;
pub mod generator;
pub mod live;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod terminal;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use thiserror::Error;
use tokio::sync::mpsc;

pub use app::App;
use data::{BackendError, QuizProvider, ResultSink};
use engine::{Phase, QuizSession, SessionSettings, SpawnReporter, TokioScheduler, Wakeup};
use generator::GenerateError;
use live::LiveError;
use models::{Participant, Quiz};

/// Error type for quiz operations.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("question generation failed: {0}")]
    Generate(#[from] GenerateError),

    #[error("live session error: {0}")]
    Live(#[from] LiveError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// The terminal player's app, driven by real time.
pub type PlayerApp = App<TokioScheduler, SpawnReporter>;

/// How long quitting waits for a result that is still being submitted.
/// Longer than the REST client's request timeout so failures get logged.
const SUBMIT_GRACE: Duration = Duration::from_secs(12);

/// A quiz attempt that can be run in the terminal.
pub struct Player {
    app: PlayerApp,
    wakeups: mpsc::UnboundedReceiver<Wakeup>,
    reporter: SpawnReporter,
}

impl Player {
    /// Fetch the quiz and prepare a session for it. Fetch failures are logged
    /// and leave the player on the unavailable screen.
    pub async fn load(
        provider: &dyn QuizProvider,
        sink: Arc<dyn ResultSink>,
        quiz_id: &str,
        participant: Participant,
        settings: SessionSettings,
    ) -> Self {
        let quiz = fetch_quiz(provider, quiz_id).await;
        Self::new(quiz, sink, participant, settings)
    }

    /// Must be called inside a tokio runtime.
    pub fn new(
        quiz: Option<Quiz>,
        sink: Arc<dyn ResultSink>,
        participant: Participant,
        settings: SessionSettings,
    ) -> Self {
        let (scheduler, wakeups) = TokioScheduler::new();
        let reporter = SpawnReporter::new(sink);
        let session = QuizSession::new(scheduler, reporter.clone(), participant, settings);
        Self {
            app: App::new(session, quiz),
            wakeups,
            reporter,
        }
    }

    pub fn app(&self) -> &PlayerApp {
        &self.app
    }

    /// Run the quiz in the terminal.
    ///
    /// This will take over the terminal, display the quiz UI, and return
    /// when the user quits and any pending result submission has settled.
    pub async fn run(mut self) -> Result<(), QuizError> {
        let outcome = {
            let mut term = terminal::init()?;
            run_event_loop(&mut term, &mut self.app, &mut self.wakeups).await
        };
        self.shutdown(SUBMIT_GRACE).await;
        outcome
    }

    /// Close the session and wait up to `grace` for result submissions.
    /// Returns how many submissions were abandoned.
    pub async fn shutdown(&mut self, grace: Duration) -> usize {
        self.app.close();
        self.reporter.flush(grace).await
    }
}

async fn fetch_quiz(provider: &dyn QuizProvider, quiz_id: &str) -> Option<Quiz> {
    match provider.get_quiz_by_id(quiz_id).await {
        Ok(Some(quiz)) => Some(quiz),
        Ok(None) => {
            tracing::info!(quiz_id, "quiz not found");
            None
        }
        Err(e) => {
            tracing::warn!(quiz_id, "failed to load quiz: {}", e);
            None
        }
    }
}

async fn run_event_loop(
    terminal: &mut terminal::AppTerminal,
    app: &mut PlayerApp,
    wakeups: &mut mpsc::UnboundedReceiver<Wakeup>,
) -> Result<(), QuizError> {
    loop {
        // Wakeups and key presses reach the session one at a time from here.
        while let Ok(wakeup) = wakeups.try_recv() {
            app.on_wakeup(wakeup);
        }

        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_input(app, key.code) {
                    break;
                }
            }
        }

        tokio::task::yield_now().await;
    }

    Ok(())
}

/// Returns true if the app should exit.
fn handle_input(app: &mut PlayerApp, key: KeyCode) -> bool {
    if app.is_welcome() {
        return handle_welcome_input(app, key);
    }

    match app.phase() {
        Phase::AwaitingAnswer => handle_quiz_input(app, key),
        Phase::Finished => handle_result_input(app, key),
        Phase::Loading | Phase::Locked => is_quit(key),
        Phase::Empty => is_quit(key) || matches!(key, KeyCode::Enter | KeyCode::Esc),
    }
}

fn is_quit(key: KeyCode) -> bool {
    matches!(key, KeyCode::Char('q') | KeyCode::Char('Q'))
}

fn handle_welcome_input(app: &mut PlayerApp, key: KeyCode) -> bool {
    match key {
        KeyCode::Enter => {
            app.start_quiz();
            false
        }
        _ => is_quit(key),
    }
}

fn handle_quiz_input(app: &mut PlayerApp, key: KeyCode) -> bool {
    match key {
        KeyCode::Up | KeyCode::Char('k') => {
            app.select_previous_option();
            false
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.select_next_option();
            false
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            app.submit_answer();
            false
        }
        KeyCode::Char(c @ '1'..='9') => {
            let position = c as usize - '1' as usize;
            app.submit_option(position);
            false
        }
        _ => is_quit(key),
    }
}

fn handle_result_input(app: &mut PlayerApp, key: KeyCode) -> bool {
    match key {
        KeyCode::Down | KeyCode::Char('j') => {
            app.scroll_results_down();
            false
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.scroll_results_up();
            false
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.restart();
            false
        }
        _ => is_quit(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryBackend;
    use crate::models::{AnswerOption, Question};

    fn quiz() -> Quiz {
        Quiz::new(
            "quiz",
            "Quiz",
            vec![Question::new(
                "q1",
                "Pick B",
                vec![
                    AnswerOption::new("a", "A", false),
                    AnswerOption::new("b", "B", true),
                ],
            )],
        )
    }

    #[tokio::test]
    async fn test_load_missing_quiz_shows_unavailable() {
        let backend = MemoryBackend::new();
        let player = Player::load(
            &backend,
            Arc::new(MemoryBackend::new()),
            "missing",
            Participant::guest("neo"),
            SessionSettings::default(),
        )
        .await;
        assert_eq!(player.app().phase(), Phase::Empty);
    }

    #[tokio::test]
    async fn test_key_handling() {
        let mut player = Player::new(
            Some(quiz()),
            Arc::new(MemoryBackend::new()),
            Participant::guest("neo"),
            SessionSettings::default(),
        );
        let app = &mut player.app;

        assert!(!handle_input(app, KeyCode::Enter));
        assert_eq!(app.phase(), Phase::AwaitingAnswer);

        assert!(!handle_input(app, KeyCode::Char('2')));
        assert_eq!(app.phase(), Phase::Locked);
        assert_eq!(app.session().score(), 1);

        // Input is ignored while locked, except quitting.
        assert!(!handle_input(app, KeyCode::Char('1')));
        assert_eq!(app.session().score(), 1);
        assert!(handle_input(app, KeyCode::Char('q')));
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_result_submission() {
        let backend = Arc::new(MemoryBackend::new());
        let mut player = Player::new(
            Some(quiz()),
            backend.clone(),
            Participant::guest("neo"),
            SessionSettings {
                question_secs: 30,
                lock_delay: Duration::from_millis(10),
            },
        );
        handle_input(&mut player.app, KeyCode::Enter);
        handle_input(&mut player.app, KeyCode::Char('2'));

        let wakeup = player.wakeups.recv().await.unwrap();
        player.app.on_wakeup(wakeup);
        assert_eq!(player.app().phase(), Phase::Finished);

        assert_eq!(player.shutdown(Duration::from_secs(5)).await, 0);
        assert_eq!(backend.results().len(), 1);
        assert!(player.app().session().is_closed());
    }
}
