// src/routes.rs

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, category, dashboard, option, question, quiz},
    state::AppState,
    utils::session::session_middleware,
};

/// Assembles the main application router.
///
/// * Everything lives under `/api`.
/// * Applies global middleware (session, Trace, CORS, rate limit).
/// * Injects global state (Database Pool, Config).
///
/// The rate limiter keys on the peer address, so the router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::me));

    let category_routes = Router::new()
        .route("/categories", get(category::list_categories))
        .route("/categories/{id}", get(category::get_category));

    let quiz_routes = Router::new()
        .route("/quizzes", get(quiz::list_quizzes).post(quiz::create_quiz))
        .route(
            "/quizzes/{id}",
            get(quiz::get_quiz)
                .put(quiz::update_quiz)
                .delete(quiz::delete_quiz),
        )
        .route("/quizzes/{id}/questions", get(quiz::list_quiz_questions))
        .route("/quizzes/{id}/start", get(quiz::start_quiz))
        .route("/quizzes/{id}/attempts", post(attempt::submit_attempt))
        .route("/my-quizzes", get(quiz::list_my_quizzes))
        .route("/dashboard", get(dashboard::get_dashboard));

    let authoring_routes = Router::new()
        .route(
            "/questions",
            get(question::list_questions).post(question::create_question),
        )
        .route(
            "/questions/{id}",
            get(question::get_question)
                .put(question::update_question)
                .delete(question::delete_question),
        )
        .route("/options", get(option::list_options).post(option::create_option))
        .route(
            "/options/{id}",
            get(option::get_option)
                .put(option::update_option)
                .delete(option::delete_option),
        );

    let api = Router::new()
        .merge(auth_routes)
        .merge(category_routes)
        .merge(quiz_routes)
        .merge(authoring_routes);

    let quota = state.config.rate_limit_per_minute.max(1);
    let governor_conf = GovernorConfigBuilder::default()
        .per_millisecond(u64::from(60_000 / quota).max(1))
        .burst_size(quota)
        .finish();

    let router = Router::new()
        .nest("/api", api)
        .fallback(not_found)
        // Global Middleware (applied from outside in)
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let router = match governor_conf {
        Some(conf) => router.layer(GovernorLayer::new(Arc::new(conf))),
        None => {
            tracing::warn!(quota, "Invalid rate limit configuration, rate limiting disabled");
            router
        }
    };

    router.with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Resource not found" })),
    )
}
