// src/handlers/dashboard.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::attempt::{
        DashboardResponse, DashboardStats, RecentActivity, RecentAttemptRow, format_average_time,
    },
    utils::session::Session,
};

const RECENT_LIMIT: i64 = 5;

/// The caller's totals and their five most recent attempts.
pub async fn get_dashboard(
    State(pool): State<SqlitePool>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let (total_score, quizzes_completed, average_time): (f64, i64, Option<f64>) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(score), 0.0), COUNT(*), AVG(time_taken)
        FROM quiz_attempts
        WHERE user_id = ?
        "#,
    )
    .bind(session.user_id)
    .fetch_one(&pool)
    .await?;

    let recent = sqlx::query_as::<_, RecentAttemptRow>(
        r#"
        SELECT a.id, q.title, a.score, a.created_at
        FROM quiz_attempts a
        JOIN quizzes q ON q.id = a.quiz_id
        WHERE a.user_id = ?
        ORDER BY a.created_at DESC, a.id DESC
        LIMIT ?
        "#,
    )
    .bind(session.user_id)
    .bind(RECENT_LIMIT)
    .fetch_all(&pool)
    .await?;

    tracing::debug!(user_id = session.user_id, quizzes_completed, "Dashboard computed");

    Ok(Json(DashboardResponse {
        stats: DashboardStats {
            total_score,
            quizzes_completed,
            average_time: format_average_time(average_time),
        },
        recent_activity: recent.into_iter().map(RecentActivity::from).collect(),
    }))
}
