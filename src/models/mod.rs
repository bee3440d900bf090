mod attempt;
mod quiz;

pub use attempt::{AnswerRecord, Attempt, AttemptResult, Participant};
pub use quiz::{AnswerOption, Question, Quiz};
