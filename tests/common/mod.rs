// tests/common/mod.rs
#![allow(dead_code)]

use std::net::SocketAddr;

use quiz_backend::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port, backed by a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_rate_limit(10_000).await
}

pub async fn spawn_app_with_rate_limit(rate_limit_per_minute: u32) -> TestApp {
    // One connection that never expires: every connection to `:memory:` is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rate_limit_per_minute,
        allowed_origins: vec!["http://localhost:5173".to_string()],
        port: 0,
        rust_log: "error".to_string(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: &Value) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request")
    }

    pub async fn put_json(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers a fresh user and returns `(user_id, token)`.
    pub async fn register_user(&self) -> (i64, String) {
        let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
        let response = self
            .post_json(
                "/register",
                None,
                &json!({
                    "name": "Test User",
                    "email": email,
                    "password": "password123",
                    "password_confirmation": "password123"
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        (
            body["user"]["id"].as_i64().expect("user id missing"),
            body["token"].as_str().expect("token missing").to_string(),
        )
    }

    /// Creates a quiz through the API and returns its id.
    pub async fn create_quiz(&self, token: &str, payload: &Value) -> i64 {
        let response = self.post_json("/quizzes", Some(token), payload).await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["id"].as_i64().expect("quiz id missing")
    }

    pub async fn publish(&self, token: &str, quiz_id: i64, payload: &Value) {
        let mut body = payload.clone();
        body["is_published"] = json!(true);
        let response = self.put_json(&format!("/quizzes/{}", quiz_id), token, &body).await;
        assert_eq!(response.status().as_u16(), 200);
    }
}

/// A valid two-question quiz: Paris is the capital, 2 + 2 = 4.
pub fn two_question_quiz(title: &str) -> Value {
    json!({
        "title": title,
        "description": "Warm-up",
        "category_id": 1,
        "total_questions": 2,
        "time_limit": 5,
        "passing_score": 50,
        "questions": [
            {
                "question_text": "Capital of France?",
                "question_type": "multiple_choice",
                "options": [
                    { "text": "Paris", "is_correct": true },
                    { "text": "Rome", "is_correct": false }
                ]
            },
            {
                "question_text": "2 + 2?",
                "question_type": "multiple_choice",
                "options": [
                    { "text": "4", "is_correct": true },
                    { "text": "5", "is_correct": false }
                ]
            }
        ]
    })
}

pub fn unique_title(prefix: &str) -> String {
    format!("{} {}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}
