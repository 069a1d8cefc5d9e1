use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Started,
    InProgress,
    Completed,
    Abandoned,
    TimedOut,
}

impl AttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::Started => "started",
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Abandoned => "abandoned",
            AttemptStatus::TimedOut => "timed_out",
        }
    }

    /// Terminal attempts never transition again and consume an attempt slot.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AttemptStatus::Completed | AttemptStatus::Abandoned | AttemptStatus::TimedOut
        )
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultiChoice,
    TrueFalse,
    FreeText,
    FillBlank,
}

impl QuestionKind {
    /// Kinds answered by selecting options rather than entering text.
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            QuestionKind::SingleChoice | QuestionKind::MultiChoice | QuestionKind::TrueFalse
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_cover_completed_abandoned_timed_out() {
        assert!(!AttemptStatus::Started.is_terminal());
        assert!(!AttemptStatus::InProgress.is_terminal());
        assert!(AttemptStatus::Completed.is_terminal());
        assert!(AttemptStatus::Abandoned.is_terminal());
        assert!(AttemptStatus::TimedOut.is_terminal());
        assert!(AttemptStatus::Started.is_active());
    }

    #[test]
    fn statuses_serialize_snake_case() {
        let json = serde_json::to_string(&AttemptStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let json = serde_json::to_string(&AttemptStatus::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");
        let json = serde_json::to_string(&QuestionKind::TrueFalse).unwrap();
        assert_eq!(json, "\"true_false\"");
    }
}
