use std::collections::HashSet;

use crate::domain::models::{AnswerOption, Question};
use crate::domain::types::QuestionKind;
use crate::error::{EngineError, EngineResult};

/// What a caller hands in for one question.
#[derive(Debug, Clone, Default)]
pub struct AnswerSubmission {
    pub selected_option_ids: Vec<String>,
    pub text: Option<String>,
    /// Client-reported seconds spent on the question.
    pub time_spent_seconds: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerGrade {
    /// None while the answer awaits manual grading.
    pub is_correct: Option<bool>,
    pub points_earned: i32,
}

pub(crate) fn grade_label(is_correct: Option<bool>) -> &'static str {
    match is_correct {
        Some(true) => "correct",
        Some(false) => "incorrect",
        None => "pending",
    }
}

/// Shape checks that run before grading; failures are `Validation` errors.
pub(crate) fn validate_submission(
    question: &Question,
    options: &[AnswerOption],
    submission: &AnswerSubmission,
) -> EngineResult<()> {
    let has_text =
        submission.text.as_deref().map(str::trim).map_or(false, |text| !text.is_empty());

    if submission.selected_option_ids.is_empty() && !has_text {
        return Err(EngineError::validation("Missing required answer content"));
    }

    if question.kind.is_choice() {
        if submission.selected_option_ids.is_empty() {
            return Err(EngineError::validation("Choice questions require a selected option"));
        }
        for selected in &submission.selected_option_ids {
            if !options.iter().any(|option| option.id == *selected) {
                return Err(EngineError::validation(format!(
                    "Option {selected} does not belong to this question"
                )));
            }
        }
        if question.kind != QuestionKind::MultiChoice && submission.selected_option_ids.len() > 1 {
            return Err(EngineError::validation("Question accepts a single option"));
        }
    } else if !has_text {
        return Err(EngineError::validation("Text questions require an answer text"));
    }

    Ok(())
}

/// Pure grading of one submission. Assumes `validate_submission` passed.
pub fn evaluate(
    question: &Question,
    options: &[AnswerOption],
    submission: &AnswerSubmission,
) -> AnswerGrade {
    match question.kind {
        QuestionKind::SingleChoice | QuestionKind::TrueFalse => {
            let correct = options.iter().find(|option| option.is_correct);
            let is_correct = match (correct, submission.selected_option_ids.as_slice()) {
                (Some(correct), [chosen]) => correct.id == *chosen,
                _ => false,
            };
            graded(question, is_correct)
        }
        QuestionKind::MultiChoice => {
            let correct: HashSet<&str> = options
                .iter()
                .filter(|option| option.is_correct)
                .map(|option| option.id.as_str())
                .collect();
            let chosen: HashSet<&str> =
                submission.selected_option_ids.iter().map(String::as_str).collect();
            graded(question, !correct.is_empty() && chosen == correct)
        }
        QuestionKind::FreeText | QuestionKind::FillBlank => {
            if question.manual_grading {
                return AnswerGrade { is_correct: None, points_earned: 0 };
            }
            let given = submission.text.as_deref().map(normalize).unwrap_or_default();
            let accepted = options
                .iter()
                .filter(|option| option.is_correct)
                .any(|option| normalize(&option.text) == given);
            graded(question, !given.is_empty() && accepted)
        }
    }
}

fn graded(question: &Question, is_correct: bool) -> AnswerGrade {
    AnswerGrade {
        is_correct: Some(is_correct),
        points_earned: if is_correct { question.points } else { 0 },
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
