use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who is taking the quiz. The engine only ever reads it as a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Participant {
    /// Authenticated user supplied by the identity provider.
    User { id: String, display_name: String },
    /// Unauthenticated participant identified by a nickname.
    Guest { nickname: String },
}

impl Participant {
    pub fn guest(nickname: impl Into<String>) -> Self {
        Self::Guest {
            nickname: nickname.into(),
        }
    }

    pub fn user(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::User {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::User { display_name, .. } => display_name,
            Self::Guest { nickname } => nickname,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User { id, .. } => Some(id),
            Self::Guest { .. } => None,
        }
    }
}

/// What happened on a single question once it was locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_index: usize,
    /// `None` when the timer ran out before any selection.
    pub selected_option: Option<String>,
    pub correct: bool,
}

impl AnswerRecord {
    pub fn timed_out(&self) -> bool {
        self.selected_option.is_none()
    }
}

/// One in-progress pass through a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub question_index: usize,
    pub score: u32,
    /// One slot per question; `Some` once the question has been locked.
    pub answers: Vec<Option<AnswerRecord>>,
    pub remaining_secs: u32,
}

impl Attempt {
    pub fn new(num_questions: usize, remaining_secs: u32) -> Self {
        Self {
            question_index: 0,
            score: 0,
            answers: vec![None; num_questions],
            remaining_secs,
        }
    }

    pub fn is_answered(&self, question_index: usize) -> bool {
        self.answers
            .get(question_index)
            .is_some_and(|slot| slot.is_some())
    }

    pub fn current_answer(&self) -> Option<&AnswerRecord> {
        self.answers.get(self.question_index)?.as_ref()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }
}

/// Final outcome of an attempt, handed to result persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub participant: Participant,
    pub quiz_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub completed_at: DateTime<Utc>,
}

impl AttemptResult {
    pub fn percentage(&self) -> f64 {
        if self.total_questions > 0 {
            (self.score as f64 / self.total_questions as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_label() {
        assert_eq!(Participant::guest("neo").label(), "neo");
        let user = Participant::user("42", "Trinity");
        assert_eq!(user.label(), "Trinity");
        assert_eq!(user.user_id(), Some("42"));
        assert_eq!(Participant::guest("neo").user_id(), None);
    }

    #[test]
    fn test_result_percentage() {
        let mut result = AttemptResult {
            participant: Participant::guest("neo"),
            quiz_id: "quiz".to_string(),
            score: 3,
            total_questions: 4,
            completed_at: Utc::now(),
        };
        assert_eq!(result.percentage(), 75.0);

        result.total_questions = 0;
        result.score = 0;
        assert_eq!(result.percentage(), 0.0);
    }

    #[test]
    fn test_participant_serialization() {
        let json = serde_json::to_string(&Participant::guest("neo")).unwrap();
        assert!(json.contains("\"kind\":\"guest\""));
    }

    #[test]
    fn test_attempt_tracking() {
        let mut attempt = Attempt::new(3, 30);
        assert!(!attempt.is_answered(0));
        attempt.answers[0] = Some(AnswerRecord {
            question_index: 0,
            selected_option: None,
            correct: false,
        });
        assert!(attempt.is_answered(0));
        assert!(attempt.current_answer().is_some_and(AnswerRecord::timed_out));
        assert_eq!(attempt.answered_count(), 1);
        assert!(!attempt.is_answered(7));
    }
}
