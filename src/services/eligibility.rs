use crate::core::state::Engine;
use crate::domain::models::Quiz;
use crate::error::{EngineError, EngineResult};
use crate::store::Gateway;

#[derive(Debug, Clone)]
pub struct Eligibility {
    pub quiz: Quiz,
    /// Terminal attempts the user has already spent on this quiz.
    pub prior_attempts: i64,
}

/// Decides whether `user_id` may start a new attempt on `quiz_id`.
/// Checks run in order; the first failure wins. Inactive quizzes read as
/// missing so callers cannot probe for their existence.
pub async fn can_start<G: Gateway>(
    engine: &Engine<G>,
    user_id: &str,
    quiz_id: &str,
) -> EngineResult<Eligibility> {
    let quiz = engine
        .gateway()
        .find_quiz(quiz_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load quiz"))?
        .ok_or_else(|| EngineError::not_found("Quiz not found"))?;

    if !quiz.is_active {
        return Err(EngineError::not_found("Quiz not found"));
    }

    let active = engine
        .gateway()
        .find_active_attempt(user_id, quiz_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to look up active attempt"))?;
    if active.is_some() {
        return Err(EngineError::conflict("An attempt is already in progress for this quiz"));
    }

    let prior_attempts = engine
        .gateway()
        .count_terminal_attempts(user_id, quiz_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to count finished attempts"))?;
    if prior_attempts >= i64::from(quiz.max_attempts) {
        return Err(EngineError::conflict("Maximum attempts exceeded for this quiz"));
    }

    Ok(Eligibility { quiz, prior_attempts })
}
