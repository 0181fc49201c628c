//! Request session: who is calling, resolved once per request.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState, utils::jwt::verify_jwt};

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    /// Id of the bearer token the request was made with.
    pub token_id: String,
    /// Token expiry as Unix timestamp.
    pub expires_at: i64,
}

/// Axum Middleware: resolves the caller.
///
/// Decodes a `Bearer` token when one is present and, unless it has been revoked,
/// injects a `Session` into the request extensions. Requests without a usable token
/// pass through anonymously; handlers decide whether that is acceptable by extracting
/// `Session` or `MaybeSession`.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    if let Some(token) = token {
        if let Ok(claims) = verify_jwt(&token, &state.config.jwt_secret) {
            let revoked: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM revoked_tokens WHERE jti = ?")
                    .bind(&claims.jti)
                    .fetch_one(&state.pool)
                    .await?;

            match claims.user_id() {
                Ok(user_id) if revoked == 0 => {
                    req.extensions_mut().insert(Session {
                        user_id,
                        token_id: claims.jti,
                        expires_at: claims.exp as i64,
                    });
                }
                _ => tracing::debug!("Ignoring revoked or malformed token"),
            }
        }
    }

    Ok(next.run(req).await)
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::AuthError("Unauthenticated.".to_string()))
    }
}

/// Optional caller, for routes that are public but behave differently for owners.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl MaybeSession {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|s| s.user_id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(parts.extensions.get::<Session>().cloned()))
    }
}
