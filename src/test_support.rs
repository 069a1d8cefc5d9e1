use std::sync::atomic::{AtomicI32, Ordering};

use time::{Duration, PrimitiveDateTime};
use uuid::Uuid;

use crate::core::config::EngineSettings;
use crate::core::state::Engine;
use crate::core::time::primitive_now_utc;
use crate::domain::models::{AnswerOption, Attempt, AttemptResult, Question, Quiz, Review};
use crate::domain::types::{AttemptStatus, QuestionKind};
use crate::services::grading::AnswerSubmission;
use crate::services::scoring;
use crate::store::memory::MemoryGateway;
use crate::store::AttemptStore;

pub(crate) struct TestContext {
    pub(crate) engine: Engine<MemoryGateway>,
    next_order: AtomicI32,
}

/// Ids of a seeded choice question.
pub(crate) struct ChoiceQuestion {
    pub(crate) question_id: String,
    pub(crate) correct_option_id: String,
    pub(crate) wrong_option_id: String,
}

pub(crate) struct MultiChoiceQuestion {
    pub(crate) question_id: String,
    pub(crate) correct_option_ids: Vec<String>,
    pub(crate) wrong_option_id: String,
}

impl TestContext {
    pub(crate) fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub(crate) fn with_settings(settings: EngineSettings) -> Self {
        Self {
            engine: Engine::with_settings(MemoryGateway::new(), settings),
            next_order: AtomicI32::new(0),
        }
    }

    pub(crate) fn store(&self) -> &MemoryGateway {
        self.engine.gateway()
    }

    /// Thirty minutes, three attempts, 50% passing threshold, active.
    pub(crate) async fn create_quiz(&self) -> Quiz {
        self.create_quiz_with(30, 3, Some(50.0), true).await
    }

    pub(crate) async fn create_quiz_with(
        &self,
        time_limit_minutes: i32,
        max_attempts: i32,
        passing_threshold: Option<f64>,
        is_active: bool,
    ) -> Quiz {
        let quiz = Quiz {
            id: Uuid::new_v4().to_string(),
            title: "Sample quiz".to_string(),
            time_limit_minutes,
            max_attempts,
            passing_threshold,
            is_active,
            owner_id: "owner-1".to_string(),
        };
        self.store().insert_quiz(quiz.clone()).await;
        quiz
    }

    pub(crate) async fn seed_attempt(
        &self,
        user_id: &str,
        quiz_id: &str,
        status: AttemptStatus,
    ) -> Attempt {
        let now = primitive_now_utc();
        let attempt = Attempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            status,
            attempt_number: 1,
            started_at: now,
            completed_at: status.is_terminal().then_some(now),
            score: None,
            max_score: None,
            time_spent_seconds: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        assert!(self.store().create_attempt(&attempt).await.unwrap());
        attempt
    }

    pub(crate) async fn add_single_choice(&self, quiz: &Quiz, points: i32) -> ChoiceQuestion {
        let question_id =
            self.push_question(&quiz.id, QuestionKind::SingleChoice, points, true, false).await;
        let correct_option_id = self.push_option(&question_id, "Right", true, 0).await;
        let wrong_option_id = self.push_option(&question_id, "Wrong", false, 1).await;
        ChoiceQuestion { question_id, correct_option_id, wrong_option_id }
    }

    pub(crate) async fn add_multi_choice(&self, quiz: &Quiz, points: i32) -> MultiChoiceQuestion {
        let question_id =
            self.push_question(&quiz.id, QuestionKind::MultiChoice, points, true, false).await;
        let correct_option_ids = vec![
            self.push_option(&question_id, "Right A", true, 0).await,
            self.push_option(&question_id, "Right B", true, 1).await,
        ];
        let wrong_option_id = self.push_option(&question_id, "Wrong", false, 2).await;
        MultiChoiceQuestion { question_id, correct_option_ids, wrong_option_id }
    }

    pub(crate) async fn add_true_false(
        &self,
        quiz: &Quiz,
        points: i32,
        answer: bool,
    ) -> ChoiceQuestion {
        let question_id =
            self.push_question(&quiz.id, QuestionKind::TrueFalse, points, true, false).await;
        let true_id = self.push_option(&question_id, "True", answer, 0).await;
        let false_id = self.push_option(&question_id, "False", !answer, 1).await;
        let (correct_option_id, wrong_option_id) =
            if answer { (true_id, false_id) } else { (false_id, true_id) };
        ChoiceQuestion { question_id, correct_option_id, wrong_option_id }
    }

    pub(crate) async fn add_free_text(&self, quiz: &Quiz, points: i32, accepted: &str) -> String {
        let question_id =
            self.push_question(&quiz.id, QuestionKind::FreeText, points, true, false).await;
        self.push_option(&question_id, accepted, true, 0).await;
        question_id
    }

    pub(crate) async fn add_optional_free_text(
        &self,
        quiz: &Quiz,
        points: i32,
        accepted: &str,
    ) -> String {
        let question_id =
            self.push_question(&quiz.id, QuestionKind::FreeText, points, false, false).await;
        self.push_option(&question_id, accepted, true, 0).await;
        question_id
    }

    /// Free-text question that waits for a manual verdict.
    pub(crate) async fn add_manual_text(&self, quiz: &Quiz, points: i32) -> String {
        self.push_question(&quiz.id, QuestionKind::FreeText, points, true, true).await
    }

    pub(crate) async fn add_review(
        &self,
        quiz_id: &str,
        user_id: &str,
        rating: i32,
        recommended: bool,
        public: bool,
    ) {
        let review = Review {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            rating,
            recommended,
            public,
            created_at: primitive_now_utc(),
        };
        assert!(self.store().insert_review(review).await);
    }

    /// Plants a finished attempt together with its result row.
    pub(crate) async fn seed_result(
        &self,
        quiz: &Quiz,
        user_id: &str,
        score: i32,
        max_score: i32,
        completed_at: PrimitiveDateTime,
    ) -> AttemptResult {
        let started_at = completed_at - Duration::minutes(5);
        let open = Attempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz.id.clone(),
            user_id: user_id.to_string(),
            status: AttemptStatus::InProgress,
            attempt_number: 1,
            started_at,
            completed_at: None,
            score: None,
            max_score: None,
            time_spent_seconds: None,
            notes: None,
            created_at: started_at,
            updated_at: started_at,
        };
        assert!(self.store().create_attempt(&open).await.unwrap());

        let percentage = scoring::percentage(score, max_score);
        let passed = quiz.passing_threshold.map_or(true, |threshold| percentage >= threshold);
        let result = AttemptResult {
            id: Uuid::new_v4().to_string(),
            attempt_id: open.id.clone(),
            quiz_id: quiz.id.clone(),
            user_id: user_id.to_string(),
            score,
            max_score,
            percentage,
            correct_answers: 0,
            total_questions: 0,
            passed,
            passing_threshold: quiz.passing_threshold,
            time_spent_seconds: 300,
            completed_at,
            feedback: None,
            created_at: completed_at,
        };

        let mut closed = open;
        closed.status = AttemptStatus::Completed;
        closed.completed_at = Some(completed_at);
        closed.score = Some(score);
        closed.max_score = Some(max_score);
        closed.time_spent_seconds = Some(300);
        closed.updated_at = completed_at;
        assert!(self.store().finalize_attempt(&closed, Some(&result)).await.unwrap());

        result
    }

    async fn push_question(
        &self,
        quiz_id: &str,
        kind: QuestionKind,
        points: i32,
        required: bool,
        manual_grading: bool,
    ) -> String {
        let question = Question {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            text: "Question text".to_string(),
            kind,
            points,
            order_index: self.next_order.fetch_add(1, Ordering::Relaxed),
            required,
            manual_grading,
        };
        let id = question.id.clone();
        self.store().insert_question(question).await;
        id
    }

    async fn push_option(
        &self,
        question_id: &str,
        text: &str,
        is_correct: bool,
        order_index: i32,
    ) -> String {
        let option = AnswerOption {
            id: Uuid::new_v4().to_string(),
            question_id: question_id.to_string(),
            text: text.to_string(),
            is_correct,
            order_index,
        };
        let id = option.id.clone();
        self.store().insert_option(option).await;
        id
    }
}

pub(crate) fn select(option_ids: &[&str]) -> AnswerSubmission {
    AnswerSubmission {
        selected_option_ids: option_ids.iter().map(|id| id.to_string()).collect(),
        ..Default::default()
    }
}

pub(crate) fn write_text(text: &str) -> AnswerSubmission {
    AnswerSubmission { text: Some(text.to_string()), ..Default::default() }
}
