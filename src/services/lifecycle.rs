use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::core::config::TimeoutGrading;
use crate::core::state::Engine;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::domain::events::Effect;
use crate::domain::models::{Attempt, AttemptResult, Question, Quiz, SubmittedAnswer};
use crate::domain::types::AttemptStatus;
use crate::error::{EngineError, EngineResult};
use crate::services::grading::{self, AnswerSubmission};
use crate::services::{attempt_timing, eligibility, scoring};
use crate::store::{AttemptFilter, Gateway};

#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub attempt: Attempt,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub answer: SubmittedAnswer,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteOutcome {
    pub attempt: Attempt,
    pub result: AttemptResult,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbandonOutcome {
    pub attempt: Attempt,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeoutOutcome {
    pub attempt: Attempt,
    /// Present only under the `Score` timeout policy.
    pub result: Option<AttemptResult>,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub timed_out: Vec<String>,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeOutcome {
    pub answer: SubmittedAnswer,
    pub effects: Vec<Effect>,
}

/// Resume view: what has been answered and how much time is left.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub attempt: Attempt,
    pub answered_question_ids: Vec<String>,
    pub missing_required_question_ids: Vec<String>,
    /// None once the attempt is terminal.
    pub remaining_seconds: Option<i64>,
}

/// Starts a fresh attempt for `user_id` after the eligibility checks pass.
pub async fn start<G: Gateway>(
    engine: &Engine<G>,
    user_id: &str,
    quiz_id: &str,
) -> EngineResult<StartOutcome> {
    let eligibility = eligibility::can_start(engine, user_id, quiz_id).await?;
    let quiz = eligibility.quiz;
    let now = primitive_now_utc();

    let attempt = Attempt {
        id: Uuid::new_v4().to_string(),
        quiz_id: quiz.id.clone(),
        user_id: user_id.to_string(),
        status: AttemptStatus::Started,
        attempt_number: (eligibility.prior_attempts + 1) as i32,
        started_at: now,
        completed_at: None,
        score: None,
        max_score: None,
        time_spent_seconds: None,
        notes: None,
        created_at: now,
        updated_at: now,
    };

    let inserted = engine
        .gateway()
        .create_attempt(&attempt)
        .await
        .map_err(|err| EngineError::store(err, "Failed to create attempt"))?;
    if !inserted {
        // lost the race against a parallel start
        return Err(EngineError::conflict("An attempt is already in progress for this quiz"));
    }

    tracing::info!(
        attempt_id = %attempt.id,
        quiz_id = %quiz.id,
        user_id = %user_id,
        attempt_number = attempt.attempt_number,
        "Attempt started"
    );
    metrics::counter!("quiz_attempts_started_total").increment(1);

    let effects = vec![Effect::AttemptStarted {
        attempt_id: attempt.id.clone(),
        quiz_id: quiz.id.clone(),
        user_id: user_id.to_string(),
        attempt_number: attempt.attempt_number,
        started_at: format_primitive(now),
    }];

    Ok(StartOutcome { attempt, effects })
}

/// Grades and stores one answer. Re-answering the same question overwrites
/// the previous row; the first answer moves the attempt to InProgress.
pub async fn record_answer<G: Gateway>(
    engine: &Engine<G>,
    attempt_id: &str,
    question_id: &str,
    submission: AnswerSubmission,
) -> EngineResult<RecordOutcome> {
    let attempt = require_attempt(engine, attempt_id).await?;
    ensure_active(&attempt)?;
    let quiz = require_quiz(engine, &attempt.quiz_id).await?;
    enforce_deadline(engine, &quiz, &attempt, 0).await?;

    let question = require_question(engine, &quiz.id, question_id).await?;
    let options = engine
        .gateway()
        .list_options(question_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load answer options"))?;

    grading::validate_submission(&question, &options, &submission)?;
    let grade = grading::evaluate(&question, &options, &submission);
    let now = primitive_now_utc();

    let existing = engine
        .gateway()
        .find_answer(attempt_id, question_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to look up previous answer"))?;
    let resubmission = existing.is_some();

    let answer = match existing {
        Some(mut previous) => {
            previous.selected_option_ids = submission.selected_option_ids;
            previous.text_answer = submission.text;
            previous.is_correct = grade.is_correct;
            previous.points_earned = grade.points_earned;
            previous.answered_at = now;
            previous.time_spent_seconds = submission.time_spent_seconds;
            previous.updated_at = now;
            previous
        }
        None => SubmittedAnswer {
            id: Uuid::new_v4().to_string(),
            attempt_id: attempt_id.to_string(),
            question_id: question_id.to_string(),
            selected_option_ids: submission.selected_option_ids,
            text_answer: submission.text,
            is_correct: grade.is_correct,
            points_earned: grade.points_earned,
            answered_at: now,
            time_spent_seconds: submission.time_spent_seconds,
            created_at: now,
            updated_at: now,
        },
    };

    if attempt.status == AttemptStatus::Started {
        let mut progressed = attempt.clone();
        progressed.status = AttemptStatus::InProgress;
        progressed.updated_at = now;
        let saved = engine
            .gateway()
            .save_attempt(&progressed)
            .await
            .map_err(|err| EngineError::store(err, "Failed to update attempt status"))?;
        if !saved {
            return Err(EngineError::conflict("Attempt was finalized concurrently"));
        }
    }

    engine
        .gateway()
        .upsert_answer(&answer)
        .await
        .map_err(|err| EngineError::store(err, "Failed to store answer"))?;

    let label = grading::grade_label(grade.is_correct);
    tracing::debug!(
        attempt_id = %attempt_id,
        question_id = %question_id,
        grade = label,
        resubmission,
        "Answer recorded"
    );
    metrics::counter!("quiz_answers_recorded_total", "grade" => label).increment(1);

    let effects = vec![Effect::AnswerRecorded {
        attempt_id: attempt_id.to_string(),
        question_id: question_id.to_string(),
        grade: label.to_string(),
        resubmission,
    }];

    Ok(RecordOutcome { answer, effects })
}

/// Completes an attempt, aggregates its result and commits both in one
/// store write. Completing twice reports InvalidState.
pub async fn complete<G: Gateway>(
    engine: &Engine<G>,
    actor_id: &str,
    attempt_id: &str,
) -> EngineResult<CompleteOutcome> {
    let attempt = require_attempt(engine, attempt_id).await?;
    if attempt.user_id != actor_id {
        return Err(EngineError::Unauthorized("Attempt belongs to another user"));
    }
    ensure_active(&attempt)?;
    let quiz = require_quiz(engine, &attempt.quiz_id).await?;
    let grace = engine.settings().timeout.completion_grace_seconds;
    enforce_deadline(engine, &quiz, &attempt, grace).await?;

    let now = primitive_now_utc();
    let time_spent = attempt_timing::time_spent_seconds(attempt.started_at, now);

    let mut completed = attempt;
    completed.status = AttemptStatus::Completed;
    completed.completed_at = Some(now);
    completed.time_spent_seconds = Some(time_spent);
    completed.updated_at = now;

    let result = scoring::aggregate(engine, &quiz, &completed, now, time_spent).await?;
    completed.score = Some(result.score);
    completed.max_score = Some(result.max_score);

    let committed = engine
        .gateway()
        .finalize_attempt(&completed, Some(&result))
        .await
        .map_err(|err| EngineError::store(err, "Failed to finalize attempt"))?;
    if !committed {
        return Err(EngineError::conflict("Attempt was finalized concurrently"));
    }

    tracing::info!(
        attempt_id = %completed.id,
        quiz_id = %quiz.id,
        score = result.score,
        max_score = result.max_score,
        passed = result.passed,
        "Attempt completed"
    );
    metrics::counter!("quiz_attempts_finished_total", "status" => "completed").increment(1);
    metrics::histogram!("quiz_attempt_time_spent_seconds").record(time_spent as f64);

    let effects = vec![Effect::AttemptCompleted {
        attempt_id: completed.id.clone(),
        result_id: result.id.clone(),
        passed: result.passed,
        percentage: result.percentage,
        completed_at: format_primitive(now),
    }];

    Ok(CompleteOutcome { attempt: completed, result, effects })
}

/// Walks away from an attempt. The slot stays spent and no result is
/// produced; an explicit abandon wins over a not-yet-detected timeout.
pub async fn abandon<G: Gateway>(
    engine: &Engine<G>,
    actor_id: &str,
    attempt_id: &str,
    notes: Option<String>,
) -> EngineResult<AbandonOutcome> {
    let attempt = require_attempt(engine, attempt_id).await?;
    if attempt.user_id != actor_id {
        return Err(EngineError::Unauthorized("Attempt belongs to another user"));
    }
    ensure_active(&attempt)?;

    let now = primitive_now_utc();
    let mut abandoned = attempt;
    abandoned.status = AttemptStatus::Abandoned;
    abandoned.completed_at = Some(now);
    abandoned.time_spent_seconds =
        Some(attempt_timing::time_spent_seconds(abandoned.started_at, now));
    abandoned.notes = notes;
    abandoned.updated_at = now;

    let committed = engine
        .gateway()
        .finalize_attempt(&abandoned, None)
        .await
        .map_err(|err| EngineError::store(err, "Failed to finalize attempt"))?;
    if !committed {
        return Err(EngineError::conflict("Attempt was finalized concurrently"));
    }

    tracing::info!(attempt_id = %abandoned.id, quiz_id = %abandoned.quiz_id, "Attempt abandoned");
    metrics::counter!("quiz_attempts_finished_total", "status" => "abandoned").increment(1);

    let effects = vec![Effect::AttemptAbandoned {
        attempt_id: abandoned.id.clone(),
        completed_at: format_primitive(now),
    }];

    Ok(AbandonOutcome { attempt: abandoned, effects })
}

/// Marks an attempt timed out. Callers may force this at any moment; the
/// lazy deadline check and the sweep only reach for it when overdue.
pub async fn time_out<G: Gateway>(
    engine: &Engine<G>,
    attempt_id: &str,
) -> EngineResult<TimeoutOutcome> {
    let attempt = require_attempt(engine, attempt_id).await?;
    ensure_active(&attempt)?;
    let quiz = require_quiz(engine, &attempt.quiz_id).await?;
    apply_timeout(engine, &quiz, attempt).await
}

/// Times out every active attempt whose deadline has passed. Meant to be
/// called from an external scheduler; nothing here spawns tasks.
pub async fn time_out_overdue<G: Gateway>(engine: &Engine<G>) -> EngineResult<SweepOutcome> {
    let filter = AttemptFilter { active_only: true, ..Default::default() };
    let attempts = engine
        .gateway()
        .list_attempts(&filter)
        .await
        .map_err(|err| EngineError::store(err, "Failed to list active attempts"))?;

    let now = primitive_now_utc();
    let mut timed_out = Vec::new();
    let mut effects = Vec::new();

    for attempt in attempts {
        let quiz = engine
            .gateway()
            .find_quiz(&attempt.quiz_id)
            .await
            .map_err(|err| EngineError::store(err, "Failed to load quiz"))?;
        let Some(quiz) = quiz else { continue };
        let deadline = attempt_timing::attempt_deadline(attempt.started_at, quiz.time_limit_minutes);
        if !attempt_timing::is_overdue(deadline, now, 0) {
            continue;
        }
        match apply_timeout(engine, &quiz, attempt).await {
            Ok(outcome) => {
                timed_out.push(outcome.attempt.id.clone());
                effects.extend(outcome.effects);
            }
            // another worker finalized it first
            Err(EngineError::Conflict(_)) | Err(EngineError::InvalidState(_)) => continue,
            Err(err) => return Err(err),
        }
    }

    if !timed_out.is_empty() {
        tracing::info!(timed_out = timed_out.len(), "Closed overdue attempts");
        metrics::counter!("overdue_attempts_timed_out_total").increment(timed_out.len() as u64);
    }

    Ok(SweepOutcome { timed_out, effects })
}

/// Snapshot for resuming or reviewing an attempt. Reading an active
/// attempt counts as a touch, so an overdue one times out here too.
pub async fn attempt_progress<G: Gateway>(
    engine: &Engine<G>,
    attempt_id: &str,
) -> EngineResult<ProgressView> {
    let attempt = require_attempt(engine, attempt_id).await?;
    let quiz = require_quiz(engine, &attempt.quiz_id).await?;
    if attempt.status.is_active() {
        enforce_deadline(engine, &quiz, &attempt, 0).await?;
    }

    let questions = engine
        .gateway()
        .list_questions(&quiz.id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load quiz questions"))?;
    let answers = engine
        .gateway()
        .list_answers(attempt_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load submitted answers"))?;

    let answered: HashSet<&str> = answers.iter().map(|answer| answer.question_id.as_str()).collect();
    let answered_question_ids = questions
        .iter()
        .filter(|question| answered.contains(question.id.as_str()))
        .map(|question| question.id.clone())
        .collect();
    let missing_required_question_ids = questions
        .iter()
        .filter(|question| question.required && !answered.contains(question.id.as_str()))
        .map(|question| question.id.clone())
        .collect();

    let remaining_seconds = if attempt.status.is_active() {
        let deadline = attempt_timing::attempt_deadline(attempt.started_at, quiz.time_limit_minutes);
        Some(attempt_timing::remaining_seconds(deadline, primitive_now_utc()))
    } else {
        None
    };

    Ok(ProgressView {
        attempt,
        answered_question_ids,
        missing_required_question_ids,
        remaining_seconds,
    })
}

/// Assigns the verdict for an answer held for manual grading. Only pending
/// answers on still-active attempts can be graded; results are never
/// rescored afterwards.
pub async fn grade_answer<G: Gateway>(
    engine: &Engine<G>,
    attempt_id: &str,
    question_id: &str,
    is_correct: bool,
) -> EngineResult<GradeOutcome> {
    let attempt = require_attempt(engine, attempt_id).await?;
    ensure_active(&attempt)?;

    let answer = engine
        .gateway()
        .find_answer(attempt_id, question_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to look up submitted answer"))?
        .ok_or_else(|| EngineError::not_found("No submitted answer for this question"))?;
    if answer.is_correct.is_some() {
        return Err(EngineError::invalid_state("Answer has already been graded"));
    }

    let question = require_question(engine, &attempt.quiz_id, question_id).await?;
    let now = primitive_now_utc();

    let mut graded = answer;
    graded.is_correct = Some(is_correct);
    graded.points_earned = if is_correct { question.points } else { 0 };
    graded.updated_at = now;

    engine
        .gateway()
        .upsert_answer(&graded)
        .await
        .map_err(|err| EngineError::store(err, "Failed to store graded answer"))?;

    tracing::info!(
        attempt_id = %attempt_id,
        question_id = %question_id,
        is_correct,
        "Answer graded manually"
    );
    metrics::counter!("quiz_answers_manually_graded_total").increment(1);

    let effects = vec![Effect::AnswerGraded {
        attempt_id: attempt_id.to_string(),
        question_id: question_id.to_string(),
        is_correct,
    }];

    Ok(GradeOutcome { answer: graded, effects })
}

pub async fn get_result<G: Gateway>(
    engine: &Engine<G>,
    attempt_id: &str,
) -> EngineResult<AttemptResult> {
    engine
        .gateway()
        .find_result(attempt_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load result"))?
        .ok_or_else(|| EngineError::not_found("Result not found"))
}

/// The one permitted mutation of a result: its free-text feedback.
pub async fn set_result_feedback<G: Gateway>(
    engine: &Engine<G>,
    attempt_id: &str,
    feedback: &str,
) -> EngineResult<Vec<Effect>> {
    let updated = engine
        .gateway()
        .save_result_feedback(attempt_id, feedback)
        .await
        .map_err(|err| EngineError::store(err, "Failed to store result feedback"))?;
    if !updated {
        return Err(EngineError::not_found("Result not found"));
    }

    tracing::info!(attempt_id = %attempt_id, "Result feedback recorded");

    Ok(vec![Effect::FeedbackRecorded { attempt_id: attempt_id.to_string() }])
}

/// The caller's resume lookup. An overdue "active" attempt is timed out on
/// the spot and reported as absent.
pub async fn active_attempt<G: Gateway>(
    engine: &Engine<G>,
    user_id: &str,
    quiz_id: &str,
) -> EngineResult<Option<Attempt>> {
    let found = engine
        .gateway()
        .find_active_attempt(user_id, quiz_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to look up active attempt"))?;
    let Some(attempt) = found else { return Ok(None) };

    let quiz = require_quiz(engine, &attempt.quiz_id).await?;
    match enforce_deadline(engine, &quiz, &attempt, 0).await {
        Ok(()) => Ok(Some(attempt)),
        Err(EngineError::InvalidState(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

pub async fn list_attempts<G: Gateway>(
    engine: &Engine<G>,
    filter: &AttemptFilter,
) -> EngineResult<Vec<Attempt>> {
    engine
        .gateway()
        .list_attempts(filter)
        .await
        .map_err(|err| EngineError::store(err, "Failed to list attempts"))
}

async fn require_attempt<G: Gateway>(
    engine: &Engine<G>,
    attempt_id: &str,
) -> EngineResult<Attempt> {
    engine
        .gateway()
        .find_attempt(attempt_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load attempt"))?
        .ok_or_else(|| EngineError::not_found("Attempt not found"))
}

async fn require_quiz<G: Gateway>(engine: &Engine<G>, quiz_id: &str) -> EngineResult<Quiz> {
    engine
        .gateway()
        .find_quiz(quiz_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load quiz"))?
        .ok_or_else(|| EngineError::not_found("Quiz not found"))
}

async fn require_question<G: Gateway>(
    engine: &Engine<G>,
    quiz_id: &str,
    question_id: &str,
) -> EngineResult<Question> {
    let questions = engine
        .gateway()
        .list_questions(quiz_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load quiz questions"))?;
    questions
        .into_iter()
        .find(|question| question.id == question_id)
        .ok_or_else(|| EngineError::not_found("Question not found"))
}

fn ensure_active(attempt: &Attempt) -> EngineResult<()> {
    if attempt.status.is_terminal() {
        return Err(EngineError::invalid_state("Attempt is no longer active"));
    }
    Ok(())
}

/// Lazy deadline check run on every touch of an active attempt. Overdue
/// attempts are flipped to TimedOut here and the touching operation fails.
async fn enforce_deadline<G: Gateway>(
    engine: &Engine<G>,
    quiz: &Quiz,
    attempt: &Attempt,
    grace_seconds: u64,
) -> EngineResult<()> {
    let deadline = attempt_timing::attempt_deadline(attempt.started_at, quiz.time_limit_minutes);
    if !attempt_timing::is_overdue(deadline, primitive_now_utc(), grace_seconds) {
        return Ok(());
    }

    match apply_timeout(engine, quiz, attempt.clone()).await {
        Ok(_) => Err(EngineError::invalid_state("Attempt timed out")),
        // a concurrent toucher flipped it first; same answer for the caller
        Err(EngineError::Conflict(_)) => Err(EngineError::invalid_state("Attempt timed out")),
        Err(err) => Err(err),
    }
}

/// Shared TimedOut transition. The attempt closes at its deadline, not at
/// the detection instant, so lazily found timeouts do not inflate
/// time-spent.
async fn apply_timeout<G: Gateway>(
    engine: &Engine<G>,
    quiz: &Quiz,
    attempt: Attempt,
) -> EngineResult<TimeoutOutcome> {
    let deadline = attempt_timing::attempt_deadline(attempt.started_at, quiz.time_limit_minutes);
    let time_spent = attempt_timing::time_spent_seconds(attempt.started_at, deadline);

    let mut timed_out = attempt;
    timed_out.status = AttemptStatus::TimedOut;
    timed_out.completed_at = Some(deadline);
    timed_out.time_spent_seconds = Some(time_spent);
    timed_out.updated_at = primitive_now_utc();

    let result = match engine.settings().timeout.grading {
        TimeoutGrading::Score => {
            let result = scoring::aggregate(engine, quiz, &timed_out, deadline, time_spent).await?;
            timed_out.score = Some(result.score);
            timed_out.max_score = Some(result.max_score);
            Some(result)
        }
        TimeoutGrading::Discard => None,
    };

    let committed = engine
        .gateway()
        .finalize_attempt(&timed_out, result.as_ref())
        .await
        .map_err(|err| EngineError::store(err, "Failed to finalize attempt"))?;
    if !committed {
        return Err(EngineError::conflict("Attempt was finalized concurrently"));
    }

    tracing::info!(
        attempt_id = %timed_out.id,
        quiz_id = %quiz.id,
        scored = result.is_some(),
        "Attempt timed out"
    );
    metrics::counter!("quiz_attempts_finished_total", "status" => "timed_out").increment(1);

    let effects = vec![Effect::AttemptTimedOut {
        attempt_id: timed_out.id.clone(),
        scored: result.is_some(),
        deadline: format_primitive(deadline),
    }];

    Ok(TimeoutOutcome { attempt: timed_out, result, effects })
}
