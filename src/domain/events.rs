use serde::Serialize;

/// Facts a finished operation wants the caller to broadcast. The engine
/// returns them in each outcome; it never dispatches anything itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    AttemptStarted {
        attempt_id: String,
        quiz_id: String,
        user_id: String,
        attempt_number: i32,
        started_at: String,
    },
    AnswerRecorded {
        attempt_id: String,
        question_id: String,
        grade: String,
        resubmission: bool,
    },
    AttemptCompleted {
        attempt_id: String,
        result_id: String,
        passed: bool,
        percentage: f64,
        completed_at: String,
    },
    AttemptAbandoned {
        attempt_id: String,
        completed_at: String,
    },
    AttemptTimedOut {
        attempt_id: String,
        scored: bool,
        deadline: String,
    },
    AnswerGraded {
        attempt_id: String,
        question_id: String,
        is_correct: bool,
    },
    FeedbackRecorded {
        attempt_id: String,
    },
}
