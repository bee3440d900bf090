use serde::{Deserialize, Serialize};

/// A quiz as loaded for a session. Never mutated once a session owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

impl Quiz {
    pub fn new(id: impl Into<String>, title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            questions,
        }
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Number of questions that can actually be answered correctly.
    pub fn answerable_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_answerable()).count()
    }
}

impl Question {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>, options: Vec<AnswerOption>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            options,
        }
    }

    /// A question is answerable when exactly one of its options is flagged correct.
    pub fn is_answerable(&self) -> bool {
        self.options.iter().filter(|o| o.is_correct).count() == 1
    }

    pub fn correct_option(&self) -> Option<&AnswerOption> {
        if self.is_answerable() {
            self.options.iter().find(|o| o.is_correct)
        } else {
            None
        }
    }

    pub fn option(&self, option_id: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

impl AnswerOption {
    pub fn new(id: impl Into<String>, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_correct,
        }
    }
}
