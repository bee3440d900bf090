//! The quiz-taking engine: countdown, scoring, session state machine and
//! result reporting.

mod reporter;
mod scheduler;
mod scoring;
mod session;
mod timer;

pub use reporter::{build_result, submit, Report, SpawnReporter};
pub use scheduler::{
    Cancel, Scheduler, TaskHandle, TokioScheduler, VirtualClock, VirtualHandle, Wakeup, WakeupKind,
};
pub use scoring::{evaluate, Evaluation};
pub use session::{Phase, QuizSession, SessionSettings, DEFAULT_LOCK_DELAY};
pub use timer::{Timer, TimerEvent, DEFAULT_QUESTION_SECS};
