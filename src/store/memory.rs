use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use time::PrimitiveDateTime;
use tokio::sync::RwLock;

use crate::domain::models::{
    AnswerOption, Attempt, AttemptResult, Question, Quiz, Review, SubmittedAnswer,
};
use crate::store::{AttemptFilter, AttemptStore, QuizCatalog, ReviewStore};

/// Reference gateway backed by in-process maps. Uniqueness invariants are
/// enforced the same way a relational store would: conditional writes under
/// one lock, keys on the unique column pairs.
#[derive(Default)]
pub struct MemoryGateway {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    quizzes: HashMap<String, Quiz>,
    questions: HashMap<String, Question>,
    options: HashMap<String, AnswerOption>,
    attempts: HashMap<String, Attempt>,
    // (attempt_id, question_id) -> answer; the key is the uniqueness rule
    answers: HashMap<(String, String), SubmittedAnswer>,
    // attempt_id -> result; one row per attempt
    results: HashMap<String, AttemptResult>,
    // (quiz_id, user_id) -> review
    reviews: HashMap<(String, String), Review>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_quiz(&self, quiz: Quiz) {
        let mut inner = self.inner.write().await;
        inner.quizzes.insert(quiz.id.clone(), quiz);
    }

    pub async fn insert_question(&self, question: Question) {
        let mut inner = self.inner.write().await;
        inner.questions.insert(question.id.clone(), question);
    }

    pub async fn insert_option(&self, option: AnswerOption) {
        let mut inner = self.inner.write().await;
        inner.options.insert(option.id.clone(), option);
    }

    /// `false` when the user already reviewed the quiz.
    pub async fn insert_review(&self, review: Review) -> bool {
        let mut inner = self.inner.write().await;
        let key = (review.quiz_id.clone(), review.user_id.clone());
        if inner.reviews.contains_key(&key) {
            return false;
        }
        inner.reviews.insert(key, review);
        true
    }

    /// Rewrites an attempt's start instant; lets tests age an attempt past
    /// its deadline without waiting. `false` when the attempt is unknown.
    pub async fn backdate_attempt(&self, attempt_id: &str, started_at: PrimitiveDateTime) -> bool {
        let mut inner = self.inner.write().await;
        match inner.attempts.get_mut(attempt_id) {
            Some(attempt) => {
                attempt.started_at = started_at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl QuizCatalog for MemoryGateway {
    async fn find_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>> {
        let inner = self.inner.read().await;
        Ok(inner.quizzes.get(quiz_id).cloned())
    }

    async fn list_questions(&self, quiz_id: &str) -> Result<Vec<Question>> {
        let inner = self.inner.read().await;
        let mut questions: Vec<Question> = inner
            .questions
            .values()
            .filter(|question| question.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by_key(|question| question.order_index);
        Ok(questions)
    }

    async fn list_options(&self, question_id: &str) -> Result<Vec<AnswerOption>> {
        let inner = self.inner.read().await;
        let mut options: Vec<AnswerOption> = inner
            .options
            .values()
            .filter(|option| option.question_id == question_id)
            .cloned()
            .collect();
        options.sort_by_key(|option| option.order_index);
        Ok(options)
    }
}

#[async_trait]
impl AttemptStore for MemoryGateway {
    async fn create_attempt(&self, attempt: &Attempt) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let active_exists = inner.attempts.values().any(|existing| {
            existing.user_id == attempt.user_id
                && existing.quiz_id == attempt.quiz_id
                && existing.status.is_active()
        });
        if active_exists {
            return Ok(false);
        }
        inner.attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(true)
    }

    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>> {
        let inner = self.inner.read().await;
        Ok(inner.attempts.get(attempt_id).cloned())
    }

    async fn find_active_attempt(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<Option<Attempt>> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .values()
            .find(|attempt| {
                attempt.user_id == user_id
                    && attempt.quiz_id == quiz_id
                    && attempt.status.is_active()
            })
            .cloned())
    }

    async fn count_terminal_attempts(&self, user_id: &str, quiz_id: &str) -> Result<i64> {
        let inner = self.inner.read().await;
        let count = inner
            .attempts
            .values()
            .filter(|attempt| {
                attempt.user_id == user_id
                    && attempt.quiz_id == quiz_id
                    && attempt.status.is_terminal()
            })
            .count();
        Ok(count as i64)
    }

    async fn list_attempts(&self, filter: &AttemptFilter) -> Result<Vec<Attempt>> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<Attempt> = inner
            .attempts
            .values()
            .filter(|attempt| {
                filter.quiz_id.as_deref().map_or(true, |quiz| attempt.quiz_id == quiz)
                    && filter.user_id.as_deref().map_or(true, |user| attempt.user_id == user)
                    && filter.status.map_or(true, |status| attempt.status == status)
                    && (!filter.active_only || attempt.status.is_active())
            })
            .cloned()
            .collect();
        attempts.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        Ok(attempts)
    }

    async fn save_attempt(&self, attempt: &Attempt) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.attempts.get(&attempt.id) {
            Some(stored) if stored.status.is_active() => {
                inner.attempts.insert(attempt.id.clone(), attempt.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_answer(&self, answer: &SubmittedAnswer) -> Result<()> {
        let mut inner = self.inner.write().await;
        let key = (answer.attempt_id.clone(), answer.question_id.clone());
        inner.answers.insert(key, answer.clone());
        Ok(())
    }

    async fn find_answer(
        &self,
        attempt_id: &str,
        question_id: &str,
    ) -> Result<Option<SubmittedAnswer>> {
        let inner = self.inner.read().await;
        Ok(inner.answers.get(&(attempt_id.to_string(), question_id.to_string())).cloned())
    }

    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<SubmittedAnswer>> {
        let inner = self.inner.read().await;
        let mut answers: Vec<SubmittedAnswer> = inner
            .answers
            .values()
            .filter(|answer| answer.attempt_id == attempt_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| a.answered_at.cmp(&b.answered_at).then(a.id.cmp(&b.id)));
        Ok(answers)
    }

    async fn finalize_attempt(
        &self,
        attempt: &Attempt,
        result: Option<&AttemptResult>,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.attempts.get(&attempt.id) {
            Some(stored) if stored.status.is_active() => {}
            _ => return Ok(false),
        }
        if let Some(result) = result {
            if inner.results.contains_key(&result.attempt_id) {
                return Ok(false);
            }
            inner.results.insert(result.attempt_id.clone(), result.clone());
        }
        inner.attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(true)
    }

    async fn find_result(&self, attempt_id: &str) -> Result<Option<AttemptResult>> {
        let inner = self.inner.read().await;
        Ok(inner.results.get(attempt_id).cloned())
    }

    async fn list_results(&self, quiz_id: &str) -> Result<Vec<AttemptResult>> {
        let inner = self.inner.read().await;
        let mut results: Vec<AttemptResult> = inner
            .results
            .values()
            .filter(|result| result.quiz_id == quiz_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| a.completed_at.cmp(&b.completed_at).then(a.id.cmp(&b.id)));
        Ok(results)
    }

    async fn save_result_feedback(&self, attempt_id: &str, feedback: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.results.get_mut(attempt_id) {
            Some(result) => {
                result.feedback = Some(feedback.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ReviewStore for MemoryGateway {
    async fn list_public_reviews(&self, quiz_id: &str) -> Result<Vec<Review>> {
        let inner = self.inner.read().await;
        let mut reviews: Vec<Review> = inner
            .reviews
            .values()
            .filter(|review| review.quiz_id == quiz_id && review.public)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(reviews)
    }
}
