use serde::Serialize;

use crate::core::state::Engine;
use crate::domain::models::AttemptResult;
use crate::error::{EngineError, EngineResult};
use crate::store::Gateway;

/// Aggregates over a quiz's results. All-zero when nothing finished yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuizStatistics {
    pub total_attempts: i64,
    pub average_score: f64,
    pub average_percentage: f64,
    pub passed_count: i64,
    pub failed_count: i64,
    pub pass_rate: f64,
    pub highest_score: i32,
    pub lowest_score: i32,
    pub average_time_spent_seconds: f64,
}

/// Aggregates over a quiz's public reviews.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub total_reviews: i64,
    /// Rounded to two decimals.
    pub average_rating: f64,
    /// Buckets for one through five stars.
    pub rating_histogram: [i64; 5],
    /// Share of reviewers who recommended the quiz, in percent.
    pub recommendation_rate: f64,
}

pub async fn quiz_statistics<G: Gateway>(
    engine: &Engine<G>,
    quiz_id: &str,
) -> EngineResult<QuizStatistics> {
    let results = engine
        .gateway()
        .list_results(quiz_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load quiz results"))?;
    if results.is_empty() {
        return Ok(QuizStatistics::default());
    }

    let total = results.len() as i64;
    let passed = results.iter().filter(|result| result.passed).count() as i64;
    let score_sum: i64 = results.iter().map(|result| i64::from(result.score)).sum();
    let percentage_sum: f64 = results.iter().map(|result| result.percentage).sum();
    let time_sum: i64 = results.iter().map(|result| result.time_spent_seconds).sum();

    Ok(QuizStatistics {
        total_attempts: total,
        average_score: score_sum as f64 / total as f64,
        average_percentage: percentage_sum / total as f64,
        passed_count: passed,
        failed_count: total - passed,
        pass_rate: passed as f64 / total as f64 * 100.0,
        highest_score: results.iter().map(|result| result.score).max().unwrap_or(0),
        lowest_score: results.iter().map(|result| result.score).min().unwrap_or(0),
        average_time_spent_seconds: time_sum as f64 / total as f64,
    })
}

/// The best results for a quiz, score descending with ties going to the
/// earlier finisher. `count` is clamped to the configured cap.
pub async fn top_scores<G: Gateway>(
    engine: &Engine<G>,
    quiz_id: &str,
    count: usize,
) -> EngineResult<Vec<AttemptResult>> {
    let cap = (engine.settings().statistics.top_scores_max as usize).max(1);
    let count = count.clamp(1, cap);

    let mut results = engine
        .gateway()
        .list_results(quiz_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load quiz results"))?;
    results.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.completed_at.cmp(&b.completed_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(count);

    Ok(results)
}

pub async fn review_summary<G: Gateway>(
    engine: &Engine<G>,
    quiz_id: &str,
) -> EngineResult<ReviewSummary> {
    let reviews = engine
        .gateway()
        .list_public_reviews(quiz_id)
        .await
        .map_err(|err| EngineError::store(err, "Failed to load quiz reviews"))?;
    if reviews.is_empty() {
        return Ok(ReviewSummary::default());
    }

    let total = reviews.len() as i64;
    let mut rating_histogram = [0i64; 5];
    let mut rating_sum = 0i64;
    let mut recommended = 0i64;
    for review in &reviews {
        rating_sum += i64::from(review.rating);
        if review.recommended {
            recommended += 1;
        }
        if let Some(bucket) = rating_histogram.get_mut((review.rating - 1) as usize) {
            *bucket += 1;
        }
    }

    Ok(ReviewSummary {
        total_reviews: total,
        average_rating: round2(rating_sum as f64 / total as f64),
        rating_histogram,
        recommendation_rate: round2(recommended as f64 / total as f64 * 100.0),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
