use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::state::Engine;
use crate::core::time::primitive_now_utc;
use crate::domain::models::{Attempt, AttemptResult, Question, Quiz, SubmittedAnswer};
use crate::error::{EngineError, EngineResult};
use crate::store::Gateway;

/// Raw sums over a quiz's questions and an attempt's recorded answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub score: i32,
    pub max_score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
}

/// Pending answers contribute zero points and do not count as correct.
/// Unanswered questions still count toward `max_score`.
pub fn tally(questions: &[Question], answers: &[SubmittedAnswer]) -> Tally {
    Tally {
        score: answers.iter().map(|answer| answer.points_earned).sum(),
        max_score: questions.iter().map(|question| question.points).sum(),
        correct_answers: answers
            .iter()
            .filter(|answer| answer.is_correct == Some(true))
            .count() as i32,
        total_questions: questions.len() as i32,
    }
}

pub fn percentage(score: i32, max_score: i32) -> f64 {
    if max_score > 0 {
        f64::from(score) / f64::from(max_score) * 100.0
    } else {
        0.0
    }
}

/// Builds the immutable result for an attempt that is being finalized.
/// The caller persists it together with the status transition.
pub(crate) async fn aggregate<G: Gateway>(
    engine: &Engine<G>,
    quiz: &Quiz,
    attempt: &Attempt,
    completed_at: PrimitiveDateTime,
    time_spent_seconds: i64,
) -> EngineResult<AttemptResult> {
    let existing = engine
        .gateway()
        .find_result(&attempt.id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to look up existing result"))?;
    if existing.is_some() {
        return Err(EngineError::conflict("A result already exists for this attempt"));
    }

    let questions = engine
        .gateway()
        .list_questions(&quiz.id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load quiz questions"))?;
    let answers = engine
        .gateway()
        .list_answers(&attempt.id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load submitted answers"))?;

    let tally = tally(&questions, &answers);
    if tally.score > tally.max_score {
        return Err(EngineError::validation(format!(
            "Score {} exceeds max score {}",
            tally.score, tally.max_score
        )));
    }

    let percentage = percentage(tally.score, tally.max_score);
    let passed = quiz.passing_threshold.map_or(true, |threshold| percentage >= threshold);

    Ok(AttemptResult {
        id: Uuid::new_v4().to_string(),
        attempt_id: attempt.id.clone(),
        quiz_id: quiz.id.clone(),
        user_id: attempt.user_id.clone(),
        score: tally.score,
        max_score: tally.max_score,
        percentage,
        correct_answers: tally.correct_answers,
        total_questions: tally.total_questions,
        passed,
        passing_threshold: quiz.passing_threshold,
        time_spent_seconds,
        completed_at,
        feedback: None,
        created_at: primitive_now_utc(),
    })
}
