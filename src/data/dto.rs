//! Row shapes exchanged with the backend and quiz files.
//!
//! Every field on the incoming rows is optional so that a missing column
//! becomes a [`BackendError::MalformedResponse`] naming it, instead of a
//! generic decode failure or a silently defaulted value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AnswerOption, AttemptResult, Question, Quiz};

use super::BackendError;

/// Backends hand out both numeric and string primary keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Text(String),
    Number(i64),
}

impl RowId {
    fn into_string(self) -> String {
        match self {
            RowId::Text(s) => s,
            RowId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizRow {
    pub id: Option<RowId>,
    pub title: Option<String>,
    pub questions: Option<Vec<QuestionRow>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRow {
    pub id: Option<RowId>,
    #[serde(alias = "question", alias = "question_text")]
    pub prompt: Option<String>,
    pub position: Option<i64>,
    pub options: Option<Vec<OptionRow>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionRow {
    pub id: Option<RowId>,
    #[serde(alias = "option_text")]
    pub text: Option<String>,
    #[serde(alias = "isCorrect")]
    pub is_correct: Option<bool>,
}

/// A quiz file holds either one quiz or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuizFile {
    Many(Vec<QuizRow>),
    One(QuizRow),
}

impl QuizFile {
    pub fn into_rows(self) -> Vec<QuizRow> {
        match self {
            QuizFile::Many(rows) => rows,
            QuizFile::One(row) => vec![row],
        }
    }
}

fn required<T>(value: Option<T>, what: &str) -> Result<T, BackendError> {
    value.ok_or_else(|| BackendError::malformed(format!("missing field `{}`", what)))
}

impl TryFrom<QuizRow> for Quiz {
    type Error = BackendError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        let id = required(row.id, "quiz.id")?.into_string();
        let title = required(row.title, "quiz.title")?;
        let mut rows = required(row.questions, "quiz.questions")?;

        // Unpositioned rows keep their order, after the positioned ones.
        rows.sort_by_key(|q| q.position.unwrap_or(i64::MAX));

        let questions = rows
            .into_iter()
            .map(Question::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| match e {
                BackendError::MalformedResponse(msg) => {
                    BackendError::malformed(format!("quiz {}: {}", id, msg))
                }
                other => other,
            })?;

        Ok(Quiz::new(id, title, questions))
    }
}

impl TryFrom<QuestionRow> for Question {
    type Error = BackendError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let id = required(row.id, "question.id")?.into_string();
        let prompt = required(row.prompt, "question.prompt")?;
        let options = required(row.options, "question.options")?
            .into_iter()
            .map(AnswerOption::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let question = Question::new(id, prompt, options);
        if !question.is_answerable() {
            tracing::warn!(
                question_id = %question.id,
                options = question.options.len(),
                "question does not have exactly one correct option; it can never score"
            );
        }
        Ok(question)
    }
}

impl TryFrom<OptionRow> for AnswerOption {
    type Error = BackendError;

    fn try_from(row: OptionRow) -> Result<Self, Self::Error> {
        Ok(AnswerOption::new(
            required(row.id, "option.id")?.into_string(),
            required(row.text, "option.text")?,
            required(row.is_correct, "option.is_correct")?,
        ))
    }
}

/// Row inserted into the attempts table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRow {
    pub user_id: Option<String>,
    pub nickname: String,
    pub quiz_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub completed_at: DateTime<Utc>,
}

impl From<&AttemptResult> for AttemptRow {
    fn from(result: &AttemptResult) -> Self {
        Self {
            user_id: result.participant.user_id().map(str::to_string),
            nickname: result.participant.label().to_string(),
            quiz_id: result.quiz_id.clone(),
            score: result.score,
            total_questions: result.total_questions,
            completed_at: result.completed_at,
        }
    }
}

/// Decode a list of quiz rows, as returned by a filtered table query.
pub fn decode_quiz_rows(body: &str) -> Result<Vec<Quiz>, BackendError> {
    let rows: Vec<QuizRow> = serde_json::from_str(body)?;
    rows.into_iter().map(Quiz::try_from).collect()
}
