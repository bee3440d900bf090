use crate::models::Question;

/// Outcome of scoring one locked question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: bool,
    /// Amount added to the running score: 1 if correct, else 0.
    pub points: u32,
}

impl Evaluation {
    fn from_correct(correct: bool) -> Self {
        Self {
            correct,
            points: u32::from(correct),
        }
    }
}

/// Score a selection against a question.
///
/// `None` means the timer ran out with nothing selected. Questions that do
/// not have exactly one correct option never score. With duplicated option
/// ids the first match decides.
pub fn evaluate(question: &Question, selected_option_id: Option<&str>) -> Evaluation {
    let Some(selected) = selected_option_id else {
        return Evaluation::from_correct(false);
    };

    if !question.is_answerable() {
        return Evaluation::from_correct(false);
    }

    let correct = question
        .option(selected)
        .is_some_and(|option| option.is_correct);
    Evaluation::from_correct(correct)
}
