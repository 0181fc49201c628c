// src/handlers/auth.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{AuthResponse, LoginRequest, RegisterRequest, USER_COLUMNS, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
        session::Session,
        validation::{self, AppJson, ValidatedJson, push_error},
    },
};

const EMAIL_TAKEN: &str = "The email has already been taken.";

async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    Ok(
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(pool)
            .await?,
    )
}

/// Registers a new user and signs them in.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with the user (excluding password) and a bearer token.
pub async fn register(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut errors = validation::collect(&payload);
    if let (Some(password), Some(confirmation)) = (&payload.password, &payload.password_confirmation) {
        if password != confirmation {
            push_error(&mut errors, "password", "The password confirmation does not match.");
        }
    }
    if let Some(email) = payload.email.as_deref() {
        if !errors.contains_key("email") && find_user_by_email(&pool, email).await?.is_some() {
            push_error(&mut errors, "email", EMAIL_TAKEN);
        }
    }
    validation::finish(errors)?;

    let (Some(name), Some(email), Some(password)) = (payload.name, payload.email, payload.password)
    else {
        return Err(AppError::InternalServerError("validated registration incomplete".to_string()));
    };

    let hashed_password = hash_password(&password)?;

    let id = sqlx::query("INSERT INTO users (name, email, password) VALUES (?, ?, ?)")
        .bind(&name)
        .bind(&email)
        .bind(&hashed_password)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::field("email", EMAIL_TAKEN)
            } else {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })?
        .last_insert_rowid();

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_one(&pool)
        .await?;

    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;
    tracing::info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            token,
            message: "Registration successful",
        }),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown email and wrong password are reported identically, as a validation
/// error on `email`.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let user = find_user_by_email(&pool, &email).await.map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        e
    })?;

    let user = match user {
        Some(user) if verify_password(&password, &user.password)? => user,
        _ => {
            tracing::warn!("Failed login attempt");
            return Err(AppError::field("email", "The provided credentials are incorrect."));
        }
    };

    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(AuthResponse {
        user,
        token,
        message: "Login successful",
    }))
}

/// Revokes the token the request was made with. Other tokens stay valid.
pub async fn logout(
    State(pool): State<SqlitePool>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as i64;

    sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?, ?)")
        .bind(&session.token_id)
        .bind(session.expires_at)
        .execute(&pool)
        .await?;

    // Expired tokens are rejected on signature check anyway.
    sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
        .bind(now)
        .execute(&pool)
        .await?;

    tracing::info!(user_id = session.user_id, "User logged out");

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// The authenticated user's own account.
pub async fn me(
    State(pool): State<SqlitePool>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(session.user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::AuthError("Unauthenticated.".to_string()))?;

    Ok(Json(json!({
        "user": user,
        "message": "User retrieved successfully",
    })))
}
