// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, FieldErrors},
    handlers::quiz::{attach_options, find_owned_quiz, find_quiz, sync_total_questions},
    models::{
        question::{QUESTION_COLUMNS, Question, QuestionRequest, QuestionType},
        quiz::Quiz,
    },
    utils::{
        session::Session,
        validation::{ValidatedJson, finish, is_valid_url, push_error},
    },
};

/// Fetches a question row or reports 404.
pub(crate) async fn find_question(pool: &SqlitePool, id: i64) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(&format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
}

/// Resolves the quiz a question payload points at and checks the caller owns it.
/// A dangling `quiz_id` is a validation failure, not a 404.
async fn target_quiz(pool: &SqlitePool, quiz_id: i64, session: &Session) -> Result<Quiz, AppError> {
    let quiz = find_quiz(pool, quiz_id).await.map_err(|e| match e {
        AppError::NotFound(_) => AppError::field("quiz_id", "The selected quiz is invalid."),
        other => other,
    })?;
    if !quiz.is_owned_by(session.user_id) {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }
    Ok(quiz)
}

/// Rules beyond the declarative ones: a known type and well-formed media links.
fn check_question(payload: &QuestionRequest) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    if let Some(raw) = payload.question_type.as_deref() {
        if QuestionType::parse(raw).is_none() {
            push_error(&mut errors, "question_type", "The selected question type is invalid.");
        }
    }
    for (field, url) in [("image_url", &payload.image_url), ("audio_url", &payload.audio_url)] {
        if url.as_deref().is_some_and(|u| !is_valid_url(u)) {
            push_error(&mut errors, field, "The media link must be a valid URL.");
        }
    }
    finish(errors)
}

/// Lists questions of every quiz the caller may see: published ones and their own drafts.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT q.id, q.quiz_id, q.question_text, q.question_type, q.image_url, q.audio_url,
               q.points, q.created_at, q.updated_at
        FROM questions q
        JOIN quizzes z ON z.id = q.quiz_id
        WHERE z.is_published = 1 OR z.user_id = ?
        ORDER BY q.id
        "#,
    )
    .bind(session.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attach_options(&pool, questions).await?))
}

/// Adds a question to a quiz the caller owns.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    session: Session,
    ValidatedJson(payload): ValidatedJson<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_question(&payload)?;
    let quiz_id = payload.quiz_id.unwrap_or_default();
    target_quiz(&pool, quiz_id, &session).await?;

    let id = sqlx::query(
        r#"
        INSERT INTO questions (quiz_id, question_text, question_type, image_url, audio_url, points)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(quiz_id)
    .bind(&payload.question_text)
    .bind(&payload.question_type)
    .bind(&payload.image_url)
    .bind(&payload.audio_url)
    .bind(payload.points)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?
    .last_insert_rowid();

    sync_total_questions(&pool, quiz_id).await?;
    tracing::info!(question_id = id, quiz_id, "Question created");

    let question = find_question(&pool, id).await?;
    let created = attach_options(&pool, vec![question]).await?;
    Ok((StatusCode::CREATED, Json(created.into_iter().next())))
}

/// One question with its options, if its quiz is visible to the caller.
pub async fn get_question(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = find_question(&pool, id).await?;
    let quiz = find_quiz(&pool, question.quiz_id).await?;
    if !quiz.is_visible_to(Some(session.user_id)) {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    let mut loaded = attach_options(&pool, vec![question]).await?;
    Ok(Json(loaded.pop()))
}

/// Replaces a question. The caller must own both its current and its target quiz.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_question(&pool, id).await?;
    find_owned_quiz(&pool, existing.quiz_id, &session).await?;

    check_question(&payload)?;
    let quiz_id = payload.quiz_id.unwrap_or_default();
    target_quiz(&pool, quiz_id, &session).await?;

    sqlx::query(
        r#"
        UPDATE questions
        SET quiz_id = ?, question_text = ?, question_type = ?, image_url = ?, audio_url = ?,
            points = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(quiz_id)
    .bind(&payload.question_text)
    .bind(&payload.question_type)
    .bind(&payload.image_url)
    .bind(&payload.audio_url)
    .bind(payload.points)
    .bind(id)
    .execute(&pool)
    .await?;

    if quiz_id != existing.quiz_id {
        sync_total_questions(&pool, existing.quiz_id).await?;
        sync_total_questions(&pool, quiz_id).await?;
    }

    let question = find_question(&pool, id).await?;
    let mut loaded = attach_options(&pool, vec![question]).await?;
    Ok(Json(loaded.pop()))
}

/// Deletes a question and its options. Owner of the quiz only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = find_question(&pool, id).await?;
    let quiz = find_owned_quiz(&pool, question.quiz_id, &session).await?;

    sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;
    sync_total_questions(&pool, quiz.id).await?;

    tracing::info!(question_id = id, quiz_id = quiz.id, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}
