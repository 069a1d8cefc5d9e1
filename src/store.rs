pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::{
    AnswerOption, Attempt, AttemptResult, Question, Quiz, Review, SubmittedAnswer,
};
use crate::domain::types::AttemptStatus;

/// Criteria object interpreted by the gateway; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AttemptFilter {
    pub quiz_id: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<AttemptStatus>,
    pub active_only: bool,
}

/// Read access to the quiz catalog. Authoring happens elsewhere.
#[async_trait]
pub trait QuizCatalog: Send + Sync {
    async fn find_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>>;
    /// Questions of a quiz, ordered by `order_index`.
    async fn list_questions(&self, quiz_id: &str) -> Result<Vec<Question>>;
    /// Options of a question, ordered by `order_index`.
    async fn list_options(&self, question_id: &str) -> Result<Vec<AnswerOption>>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Conditional insert: `false` when an active attempt already exists
    /// for the attempt's (user, quiz).
    async fn create_attempt(&self, attempt: &Attempt) -> Result<bool>;
    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>>;
    async fn find_active_attempt(&self, user_id: &str, quiz_id: &str)
        -> Result<Option<Attempt>>;
    async fn count_terminal_attempts(&self, user_id: &str, quiz_id: &str) -> Result<i64>;
    async fn list_attempts(&self, filter: &AttemptFilter) -> Result<Vec<Attempt>>;
    /// Non-terminal update; `false` when the stored row is gone or already
    /// terminal (a concurrent finalize won).
    async fn save_attempt(&self, attempt: &Attempt) -> Result<bool>;
    /// Keyed by (attempt, question); resubmission overwrites in place.
    async fn upsert_answer(&self, answer: &SubmittedAnswer) -> Result<()>;
    async fn find_answer(
        &self,
        attempt_id: &str,
        question_id: &str,
    ) -> Result<Option<SubmittedAnswer>>;
    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<SubmittedAnswer>>;
    /// The commit primitive: writes the terminal attempt and its result in
    /// one step, only while the stored status is still active and no result
    /// row exists. `false` means a concurrent writer won and nothing was
    /// written.
    async fn finalize_attempt(
        &self,
        attempt: &Attempt,
        result: Option<&AttemptResult>,
    ) -> Result<bool>;
    async fn find_result(&self, attempt_id: &str) -> Result<Option<AttemptResult>>;
    async fn list_results(&self, quiz_id: &str) -> Result<Vec<AttemptResult>>;
    /// `false` when no result exists for the attempt.
    async fn save_result_feedback(&self, attempt_id: &str, feedback: &str) -> Result<bool>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Public reviews of a quiz; private ones never leave the store.
    async fn list_public_reviews(&self, quiz_id: &str) -> Result<Vec<Review>>;
}

/// Everything the engine needs from persistence.
pub trait Gateway: QuizCatalog + AttemptStore + ReviewStore {}

impl<T: QuizCatalog + AttemptStore + ReviewStore> Gateway for T {}
