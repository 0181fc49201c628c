// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quiz_attempts' table: one completed pass through a quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    /// Percentage of questions answered correctly.
    pub score: f64,
    /// Seconds.
    pub time_taken: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub const ATTEMPT_COLUMNS: &str =
    "id, user_id, quiz_id, score, time_taken, created_at, updated_at";

/// DTO for submitting a finished quiz run.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    /// Key: question id. Value: text of the selected option.
    /// Unanswered questions are simply absent.
    #[serde(default)]
    pub answers: HashMap<i64, String>,

    /// Seconds spent on the run.
    #[validate(
        required(message = "The time_taken field is required."),
        range(min = 0, message = "Time taken cannot be negative.")
    )]
    pub time_taken: Option<i64>,
}

/// Server-side grading result for a submitted run.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptResult {
    pub id: i64,
    pub quiz_id: i64,
    pub score: f64,
    pub correct_count: usize,
    pub total_questions: usize,
    pub passed: bool,
    pub time_taken: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AttemptResult {
    /// Combines the stored attempt with the grading detail that is not persisted.
    pub fn new(attempt: QuizAttempt, correct_count: usize, total_questions: usize, passed: bool) -> Self {
        Self {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            score: attempt.score,
            correct_count,
            total_questions,
            passed,
            time_taken: attempt.time_taken,
            created_at: attempt.created_at,
        }
    }
}

/// Aggregates over a user's attempts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_score: f64,
    pub quizzes_completed: i64,
    /// Mean seconds per attempt, rounded, with unit suffix (e.g. "45s").
    pub average_time: String,
}

/// One row of the "recent activity" list, joined with the quiz title.
#[derive(Debug, FromRow)]
pub struct RecentAttemptRow {
    pub id: i64,
    pub title: String,
    pub score: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct RecentActivity {
    pub id: i64,
    pub title: String,
    pub score: f64,
    /// e.g. "May 07, 2025"
    pub date: String,
}

impl From<RecentAttemptRow> for RecentActivity {
    fn from(row: RecentAttemptRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            score: row.score,
            date: row.created_at.format("%b %d, %Y").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub recent_activity: Vec<RecentActivity>,
}

/// Renders an average duration in whole seconds; no attempts reads as "0s".
pub fn format_average_time(average_seconds: Option<f64>) -> String {
    format!("{}s", average_seconds.unwrap_or(0.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn average_time_rounds_half_away_from_zero() {
        assert_eq!(format_average_time(None), "0s");
        assert_eq!(format_average_time(Some(44.5)), "45s");
        assert_eq!(format_average_time(Some(44.49)), "44s");
    }

    #[test]
    fn recent_activity_date_is_human_formatted() {
        let row = RecentAttemptRow {
            id: 1,
            title: "World History Quiz".into(),
            score: 80.0,
            created_at: chrono::Utc.with_ymd_and_hms(2025, 5, 7, 19, 0, 0).unwrap(),
        };
        assert_eq!(RecentActivity::from(row).date, "May 07, 2025");
    }
}
