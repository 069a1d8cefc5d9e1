use std::env;

use thiserror::Error;

/// What happens to answers already recorded when an attempt times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutGrading {
    /// Grade the recorded answers and produce a partial result.
    Score,
    /// Finalize the attempt without a result, like an abandonment.
    Discard,
}

impl TimeoutGrading {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeoutGrading::Score => "score",
            TimeoutGrading::Discard => "discard",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub timeout: TimeoutSettings,
    pub statistics: StatisticsSettings,
}

#[derive(Debug, Clone)]
pub struct TimeoutSettings {
    pub grading: TimeoutGrading,
    /// Seconds past the deadline during which Complete is still accepted.
    pub completion_grace_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct StatisticsSettings {
    pub top_scores_max: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout: TimeoutSettings {
                grading: TimeoutGrading::Score,
                completion_grace_seconds: 0,
            },
            statistics: StatisticsSettings { top_scores_max: 100 },
        }
    }
}

impl EngineSettings {
    /// Reads settings from the environment, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let grading = parse_timeout_grading(
            "QUIZCORE_TIMEOUT_GRADING",
            env_or_default("QUIZCORE_TIMEOUT_GRADING", "score"),
        )?;
        let completion_grace_seconds = parse_u64(
            "QUIZCORE_COMPLETION_GRACE_SECONDS",
            env_or_default("QUIZCORE_COMPLETION_GRACE_SECONDS", "0"),
        )?;
        let top_scores_max = parse_u64(
            "QUIZCORE_TOP_SCORES_MAX",
            env_or_default("QUIZCORE_TOP_SCORES_MAX", "100"),
        )?;

        let settings = Self {
            timeout: TimeoutSettings { grading, completion_grace_seconds },
            statistics: StatisticsSettings { top_scores_max },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.statistics.top_scores_max == 0 {
            return Err(ConfigError::InvalidValue {
                field: "QUIZCORE_TOP_SCORES_MAX",
                value: String::from("0"),
            });
        }
        Ok(())
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_timeout_grading(field: &'static str, value: String) -> Result<TimeoutGrading, ConfigError> {
    match value.to_lowercase().as_str() {
        "score" | "partial" => Ok(TimeoutGrading::Score),
        "discard" | "none" => Ok(TimeoutGrading::Discard),
        _ => Err(ConfigError::InvalidValue { field, value }),
    }
}
