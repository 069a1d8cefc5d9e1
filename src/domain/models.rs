use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::domain::types::{AttemptStatus, QuestionKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub time_limit_minutes: i32,
    pub max_attempts: i32,
    /// Percentage 0..=100; quizzes without one treat every attempt as passed.
    pub passing_threshold: Option<f64>,
    pub is_active: bool,
    pub owner_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub quiz_id: String,
    pub text: String,
    pub kind: QuestionKind,
    pub points: i32,
    pub order_index: i32,
    pub required: bool,
    /// Text questions only: grade is held Pending for a human grader.
    pub manual_grading: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub is_correct: bool,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub status: AttemptStatus,
    pub attempt_number: i32,
    pub started_at: PrimitiveDateTime,
    pub completed_at: Option<PrimitiveDateTime>,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub time_spent_seconds: Option<i64>,
    pub notes: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub selected_option_ids: Vec<String>,
    pub text_answer: Option<String>,
    /// None while the answer awaits manual grading.
    pub is_correct: Option<bool>,
    pub points_earned: i32,
    pub answered_at: PrimitiveDateTime,
    pub time_spent_seconds: Option<i64>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

/// Immutable once written, except for the free-text `feedback` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    pub id: String,
    pub attempt_id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub passed: bool,
    /// Threshold in force when the result was produced.
    pub passing_threshold: Option<f64>,
    pub time_spent_seconds: i64,
    pub completed_at: PrimitiveDateTime,
    pub feedback: Option<String>,
    pub created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub rating: i32,
    pub recommended: bool,
    pub public: bool,
    pub created_at: PrimitiveDateTime,
}
