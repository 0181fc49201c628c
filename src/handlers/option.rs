// src/handlers/option.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::{
    error::AppError,
    handlers::{
        question::find_question,
        quiz::{find_owned_quiz, find_quiz},
    },
    models::option::{OPTION_COLUMNS, OptionRequest, QuestionOption},
    utils::{session::Session, validation::ValidatedJson},
};

async fn find_option(pool: &SqlitePool, id: i64) -> Result<QuestionOption, AppError> {
    sqlx::query_as::<_, QuestionOption>(&format!("SELECT {OPTION_COLUMNS} FROM options WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Option not found".to_string()))
}

/// Checks the caller owns the quiz behind `question_id`.
/// A dangling `question_id` is a validation failure, not a 404.
async fn authorize_question(pool: &SqlitePool, question_id: i64, session: &Session) -> Result<(), AppError> {
    let question = find_question(pool, question_id).await.map_err(|e| match e {
        AppError::NotFound(_) => AppError::field("question_id", "The selected question is invalid."),
        other => other,
    })?;
    find_owned_quiz(pool, question.quiz_id, session).await?;
    Ok(())
}

/// A question keeps at most one correct option: marking one correct unmarks its siblings.
async fn clear_other_correct(
    tx: &mut Transaction<'_, Sqlite>,
    question_id: i64,
    keep: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE options SET is_correct = 0, updated_at = CURRENT_TIMESTAMP \
         WHERE question_id = ? AND id != ? AND is_correct = 1",
    )
    .bind(question_id)
    .bind(keep)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Lists options of questions whose quiz is published or owned by the caller.
pub async fn list_options(
    State(pool): State<SqlitePool>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let options = sqlx::query_as::<_, QuestionOption>(
        r#"
        SELECT o.id, o.question_id, o.text, o.is_correct, o.sort_order, o.created_at, o.updated_at
        FROM options o
        JOIN questions q ON q.id = o.question_id
        JOIN quizzes z ON z.id = q.quiz_id
        WHERE z.is_published = 1 OR z.user_id = ?
        ORDER BY o.question_id, o.sort_order, o.id
        "#,
    )
    .bind(session.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(options))
}

/// Adds an option to a question. Without an explicit `order` it goes last.
pub async fn create_option(
    State(pool): State<SqlitePool>,
    session: Session,
    ValidatedJson(payload): ValidatedJson<OptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question_id = payload.question_id.unwrap_or_default();
    authorize_question(&pool, question_id, &session).await?;
    let is_correct = payload.is_correct.unwrap_or_default();

    let mut tx = pool.begin().await?;

    let order: i64 = match payload.order {
        Some(order) => order,
        None => {
            sqlx::query_scalar("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM options WHERE question_id = ?")
                .bind(question_id)
                .fetch_one(&mut *tx)
                .await?
        }
    };

    let id = sqlx::query(
        "INSERT INTO options (question_id, text, is_correct, sort_order) VALUES (?, ?, ?, ?)",
    )
    .bind(question_id)
    .bind(&payload.text)
    .bind(is_correct)
    .bind(order)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    if is_correct {
        clear_other_correct(&mut tx, question_id, id).await?;
    }
    tx.commit().await?;

    tracing::info!(option_id = id, question_id, "Option created");
    Ok((StatusCode::CREATED, Json(find_option(&pool, id).await?)))
}

/// One option, if its quiz is visible to the caller.
pub async fn get_option(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let option = find_option(&pool, id).await?;
    let question = find_question(&pool, option.question_id).await?;
    let quiz = find_quiz(&pool, question.quiz_id).await?;
    if !quiz.is_visible_to(Some(session.user_id)) {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }
    Ok(Json(option))
}

/// Replaces an option. The caller must own the quiz of both its current and target question.
pub async fn update_option(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<OptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_option(&pool, id).await?;
    let current = find_question(&pool, existing.question_id).await?;
    find_owned_quiz(&pool, current.quiz_id, &session).await?;

    let question_id = payload.question_id.unwrap_or_default();
    authorize_question(&pool, question_id, &session).await?;
    let is_correct = payload.is_correct.unwrap_or_default();

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        UPDATE options
        SET question_id = ?, text = ?, is_correct = ?, sort_order = COALESCE(?, sort_order),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(question_id)
    .bind(&payload.text)
    .bind(is_correct)
    .bind(payload.order)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if is_correct {
        clear_other_correct(&mut tx, question_id, id).await?;
    }
    tx.commit().await?;

    Ok(Json(find_option(&pool, id).await?))
}

/// Deletes an option. Owner of the quiz only.
pub async fn delete_option(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let option = find_option(&pool, id).await?;
    let question = find_question(&pool, option.question_id).await?;
    find_owned_quiz(&pool, question.quiz_id, &session).await?;

    sqlx::query("DELETE FROM options WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    tracing::info!(option_id = id, question_id = option.question_id, "Option deleted");
    Ok(StatusCode::NO_CONTENT)
}
