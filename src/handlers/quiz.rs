// src/handlers/quiz.rs

use std::collections::{BTreeSet, HashMap};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        category::{CATEGORY_COLUMNS, Category},
        option::{OPTION_COLUMNS, QuestionOption},
        question::{QUESTION_COLUMNS, Question, QuestionWithOptions},
        quiz::{
            CreateQuizRequest, ListQuizzesParams, Page, PageParams, QUIZ_COLUMNS, Quiz, QuizDetail,
            QuizPaper, UpdateQuizRequest,
        },
        user::{USER_COLUMNS, User},
    },
    utils::{
        html::clean_html,
        session::{MaybeSession, Session},
        validation::{self, AppJson, push_error},
    },
};

const NOT_PUBLISHED: &str = "This quiz is not published yet";
const UNAUTHORIZED: &str = "Unauthorized";

/// Fetches a quiz row or reports 404.
pub(crate) async fn find_quiz(pool: &SqlitePool, id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
}

/// Fetches a quiz the caller must own; 404 if missing, 403 otherwise.
pub(crate) async fn find_owned_quiz(
    pool: &SqlitePool,
    id: i64,
    session: &Session,
) -> Result<Quiz, AppError> {
    let quiz = find_quiz(pool, id).await?;
    if !quiz.is_owned_by(session.user_id) {
        tracing::warn!(quiz_id = id, user_id = session.user_id, "Rejected write to foreign quiz");
        return Err(AppError::Forbidden(UNAUTHORIZED.to_string()));
    }
    Ok(quiz)
}

/// Re-derives `total_questions` from the rows actually present.
pub(crate) async fn sync_total_questions(pool: &SqlitePool, quiz_id: i64) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE quizzes
        SET total_questions = (SELECT COUNT(*) FROM questions WHERE quiz_id = ?),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(quiz_id)
    .bind(quiz_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Appends `(id, id, ...)` to an `IN` clause.
fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: impl IntoIterator<Item = i64>) {
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
}

/// Loads the options of each question, ordered for display.
pub(crate) async fn attach_options(
    pool: &SqlitePool,
    questions: Vec<Question>,
) -> Result<Vec<QuestionWithOptions>, AppError> {
    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {OPTION_COLUMNS} FROM options WHERE question_id IN ("
    ));
    push_id_list(&mut builder, questions.iter().map(|q| q.id));
    builder.push(" ORDER BY sort_order, id");

    let options: Vec<QuestionOption> = builder.build_query_as().fetch_all(pool).await?;

    let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    Ok(questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionWithOptions { question, options }
        })
        .collect())
}

/// Questions (with options) of several quizzes, grouped by quiz id, ordered by id.
pub(crate) async fn load_questions(
    pool: &SqlitePool,
    quiz_ids: &[i64],
) -> Result<HashMap<i64, Vec<QuestionWithOptions>>, AppError> {
    let mut grouped: HashMap<i64, Vec<QuestionWithOptions>> = HashMap::new();
    if quiz_ids.is_empty() {
        return Ok(grouped);
    }

    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id IN ("
    ));
    push_id_list(&mut builder, quiz_ids.iter().copied());
    builder.push(" ORDER BY id");

    let questions: Vec<Question> = builder.build_query_as().fetch_all(pool).await?;

    for question in attach_options(pool, questions).await? {
        grouped
            .entry(question.question.quiz_id)
            .or_default()
            .push(question);
    }
    Ok(grouped)
}

/// Expands quiz rows into full object graphs: category, questions with options,
/// and (optionally) the author.
pub(crate) async fn load_details(
    pool: &SqlitePool,
    quizzes: Vec<Quiz>,
    with_author: bool,
) -> Result<Vec<QuizDetail>, AppError> {
    if quizzes.is_empty() {
        return Ok(Vec::new());
    }

    let quiz_ids: Vec<i64> = quizzes.iter().map(|q| q.id).collect();
    let category_ids: BTreeSet<i64> = quizzes.iter().map(|q| q.category_id).collect();

    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id IN ("
    ));
    push_id_list(&mut builder, category_ids);
    let categories: HashMap<i64, Category> = builder
        .build_query_as::<Category>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let authors: HashMap<i64, User> = if with_author {
        let user_ids: BTreeSet<i64> = quizzes.iter().map(|q| q.user_id).collect();
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ("));
        push_id_list(&mut builder, user_ids);
        builder
            .build_query_as::<User>()
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    } else {
        HashMap::new()
    };

    let mut questions = load_questions(pool, &quiz_ids).await?;

    Ok(quizzes
        .into_iter()
        .map(|quiz| QuizDetail {
            category: categories.get(&quiz.category_id).cloned(),
            user: authors.get(&quiz.user_id).cloned(),
            questions: questions.remove(&quiz.id).unwrap_or_default(),
            questions_count: None,
            quiz,
        })
        .collect())
}

async fn load_detail(pool: &SqlitePool, quiz: Quiz, with_author: bool) -> Result<QuizDetail, AppError> {
    load_details(pool, vec![quiz], with_author)
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("quiz vanished while loading".to_string()))
}

async fn category_exists(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Whether another quiz already uses `title`.
async fn title_taken(pool: &SqlitePool, title: &str, except: Option<i64>) -> Result<bool, AppError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE title = ? AND (? IS NULL OR id != ?)")
            .bind(title)
            .bind(except)
            .bind(except)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

fn duplicate_title() -> AppError {
    AppError::field("title", "A quiz with this title already exists.")
}

/// Lists published quizzes, optionally filtered by category.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Query(params): Query<ListQuizzesParams>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(category_id = ?params.category_id, "Listing published quizzes");

    let quizzes = sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {QUIZ_COLUMNS} FROM quizzes \
         WHERE is_published = 1 AND (? IS NULL OR category_id = ?) \
         ORDER BY id"
    ))
    .bind(params.category_id)
    .bind(params.category_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::from(e)
    })?;

    let details = load_details(&pool, quizzes, true).await?;
    tracing::info!(count = details.len(), "Quizzes found");

    Ok(Json(details))
}

/// Creates a quiz with its questions and options.
///
/// * Every rule is checked before anything is written; all failures are reported together.
/// * The quiz starts unpublished and owned by the caller.
/// * All rows are inserted in one transaction.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    session: Session,
    AppJson(payload): AppJson<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut errors = validation::collect(&payload);
    for (field, messages) in payload.shape_errors() {
        errors.entry(field).or_default().extend(messages);
    }

    if let Some(category_id) = payload.category_id {
        if !category_exists(&pool, category_id).await? {
            push_error(&mut errors, "category_id", "The selected category is invalid.");
        }
    }
    if let Some(title) = payload.title.as_deref() {
        if !title.is_empty() && title_taken(&pool, title, None).await? {
            push_error(&mut errors, "title", "A quiz with this title already exists.");
        }
    }
    validation::finish(errors)?;

    let draft = payload
        .into_draft()
        .ok_or_else(|| AppError::InternalServerError("validated quiz payload incomplete".to_string()))?;

    let mut tx = pool.begin().await?;

    let quiz_id = sqlx::query(
        r#"
        INSERT INTO quizzes
        (title, description, category_id, user_id, total_questions, time_limit, passing_score, is_published)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(&draft.title)
    .bind(draft.description.as_deref().map(clean_html))
    .bind(draft.category_id)
    .bind(session.user_id)
    .bind(draft.total_questions)
    .bind(draft.time_limit)
    .bind(draft.passing_score)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            duplicate_title()
        } else {
            tracing::error!("Failed to insert quiz: {:?}", e);
            AppError::from(e)
        }
    })?
    .last_insert_rowid();

    for question in &draft.questions {
        let question_id = sqlx::query(
            r#"
            INSERT INTO questions (quiz_id, question_text, question_type, image_url, audio_url, points)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(quiz_id)
        .bind(&question.question_text)
        .bind(question.question_type.as_str())
        .bind(&question.image_url)
        .bind(&question.audio_url)
        .bind(question.points)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (position, option) in question.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO options (question_id, text, is_correct, sort_order) VALUES (?, ?, ?, ?)",
            )
            .bind(question_id)
            .bind(&option.text)
            .bind(option.is_correct)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    tracing::info!(
        quiz_id,
        user_id = session.user_id,
        questions = draft.questions.len(),
        "Quiz created"
    );

    let quiz = find_quiz(&pool, quiz_id).await?;
    let detail = load_detail(&pool, quiz, true).await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Returns one quiz with category, author and questions.
///
/// Drafts are visible to their author only. Unexpected failures are logged with
/// the quiz id and reported generically.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    session: MaybeSession,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, id).await.map_err(|e| log_fetch_failure(id, e))?;

    if !quiz.is_visible_to(session.user_id()) {
        return Err(AppError::Forbidden(NOT_PUBLISHED.to_string()));
    }

    let detail = load_detail(&pool, quiz, true)
        .await
        .map_err(|e| log_fetch_failure(id, e))?;

    Ok(Json(detail))
}

fn log_fetch_failure(quiz_id: i64, err: AppError) -> AppError {
    match err {
        AppError::InternalServerError(detail) => {
            tracing::error!(quiz_id, error = %detail, "Error while fetching quiz");
            AppError::InternalServerError(format!("fetching quiz {quiz_id}: {detail}"))
        }
        other => other,
    }
}

/// Updates a quiz's own fields (not its questions). Owner only.
///
/// `total_questions` is re-derived from the stored questions, so a quiz emptied
/// through the question endpoints stays editable.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    find_owned_quiz(&pool, id, &session).await?;

    let mut errors = validation::collect(&payload);

    if let Some(category_id) = payload.category_id {
        if !category_exists(&pool, category_id).await? {
            push_error(&mut errors, "category_id", "The selected category is invalid.");
        }
    }
    if let Some(title) = payload.title.as_deref() {
        if !title.is_empty() && title_taken(&pool, title, Some(id)).await? {
            push_error(&mut errors, "title", "A quiz with this title already exists.");
        }
    }
    validation::finish(errors)?;

    sqlx::query(
        r#"
        UPDATE quizzes
        SET title = ?, description = ?, category_id = ?,
            total_questions = (SELECT COUNT(*) FROM questions WHERE quiz_id = quizzes.id),
            time_limit = ?, passing_score = ?,
            is_published = COALESCE(?, is_published),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&payload.title)
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.category_id)
    .bind(payload.time_limit)
    .bind(payload.passing_score)
    .bind(payload.is_published)
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            duplicate_title()
        } else {
            tracing::error!("Failed to update quiz: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!(quiz_id = id, published = ?payload.is_published, "Quiz updated");

    let quiz = find_quiz(&pool, id).await?;
    Ok(Json(load_detail(&pool, quiz, false).await?))
}

/// Deletes a quiz; questions, options and attempts go with it. Owner only.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    find_owned_quiz(&pool, id, &session).await?;

    sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!(quiz_id = id, user_id = session.user_id, "Quiz deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Questions of one quiz with their options. Public once published.
pub async fn list_quiz_questions(
    State(pool): State<SqlitePool>,
    session: MaybeSession,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, id).await?;
    if !quiz.is_visible_to(session.user_id()) {
        return Err(AppError::Forbidden(UNAUTHORIZED.to_string()));
    }

    let questions = load_questions(&pool, &[id]).await?.remove(&id).unwrap_or_default();
    Ok(Json(questions))
}

/// The answer-free paper for a quiz run, with the countdown length in seconds.
pub async fn start_quiz(
    State(pool): State<SqlitePool>,
    session: MaybeSession,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, id).await?;
    if !quiz.is_visible_to(session.user_id()) {
        return Err(AppError::Forbidden(NOT_PUBLISHED.to_string()));
    }

    let detail = load_detail(&pool, quiz, false).await?;
    Ok(Json(QuizPaper::from(&detail)))
}

/// The caller's own quizzes, newest first, paginated.
pub async fn list_my_quizzes(
    State(pool): State<SqlitePool>,
    session: Session,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (page, per_page) = params.resolve();

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE user_id = ?")
        .bind(session.user_id)
        .fetch_one(&pool)
        .await?;

    let quizzes = sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE user_id = ? \
         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(session.user_id)
    .bind(per_page)
    .bind((page - 1).saturating_mul(per_page))
    .fetch_all(&pool)
    .await?;

    let data = load_details(&pool, quizzes, false)
        .await?
        .into_iter()
        .map(|mut detail| {
            detail.questions_count = Some(detail.questions.len() as i64);
            detail
        })
        .collect();

    Ok(Json(Page::new(data, page, per_page, total)))
}
