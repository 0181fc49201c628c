// src/handlers/attempt.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::quiz::{find_quiz, load_questions},
    models::attempt::{ATTEMPT_COLUMNS, AttemptResult, QuizAttempt, SubmitAttemptRequest},
    scoring,
    utils::{session::Session, validation::ValidatedJson},
};

/// Grades a finished run and records it as an attempt.
///
/// The score is computed here from the stored correct options; answers to
/// questions outside the quiz are ignored. Anyone who can see the quiz may submit.
pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(quiz_id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;
    if !quiz.is_visible_to(Some(session.user_id)) {
        return Err(AppError::Forbidden("This quiz is not published yet".to_string()));
    }

    let questions = load_questions(&pool, &[quiz_id])
        .await?
        .remove(&quiz_id)
        .unwrap_or_default();

    let selections: Vec<Option<&String>> = questions
        .iter()
        .map(|q| payload.answers.get(&q.question.id))
        .collect();
    let grade = scoring::grade(&questions, &selections);
    let time_taken = payload.time_taken.unwrap_or_default();

    let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
        "INSERT INTO quiz_attempts (user_id, quiz_id, score, time_taken) VALUES (?, ?, ?, ?) \
         RETURNING {ATTEMPT_COLUMNS}"
    ))
    .bind(session.user_id)
    .bind(quiz_id)
    .bind(grade.score)
    .bind(time_taken)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record attempt: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(
        attempt_id = attempt.id,
        quiz_id,
        user_id = session.user_id,
        score = attempt.score,
        "Attempt recorded"
    );

    let passed = grade.passed(quiz.passing_score);
    Ok((
        StatusCode::CREATED,
        Json(AttemptResult::new(
            attempt,
            grade.correct_count,
            grade.total_questions,
            passed,
        )),
    ))
}
