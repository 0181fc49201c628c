// tests/quiz_tests.rs

mod common;

use common::{spawn_app, two_question_quiz, unique_title};
use serde_json::{Value, json};

#[tokio::test]
async fn categories_are_seeded_with_published_counts() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;

    let payload = two_question_quiz(&unique_title("History"));
    let quiz_id = app.create_quiz(&token, &payload).await;

    let before: Vec<Value> = app.get("/categories", None).await.json().await.unwrap();
    assert_eq!(before.len(), 6);
    assert_eq!(before[0]["name"], "History");
    assert_eq!(before[0]["quizzes_count"], 0, "drafts are not counted");

    app.publish(&token, quiz_id, &payload).await;

    let after: Vec<Value> = app.get("/categories", None).await.json().await.unwrap();
    assert_eq!(after[0]["quizzes_count"], 1);

    assert_eq!(app.get("/categories/999", None).await.status().as_u16(), 404);
}

#[tokio::test]
async fn create_quiz_persists_the_whole_graph_unpublished() {
    // Arrange
    let app = spawn_app().await;
    let (user_id, token) = app.register_user().await;
    let title = unique_title("Capitals");

    // Act
    let response = app
        .post_json("/quizzes", Some(&token), &two_question_quiz(&title))
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let quiz: Value = response.json().await.unwrap();
    assert_eq!(quiz["title"], title);
    assert_eq!(quiz["user_id"], user_id);
    assert_eq!(quiz["is_published"], false);
    assert_eq!(quiz["total_questions"], 2);
    assert_eq!(quiz["category"]["id"], 1);

    let questions = quiz["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    let options = questions[0]["options"].as_array().unwrap();
    assert_eq!(options[0]["text"], "Paris");
    assert_eq!(options[0]["is_correct"], true);
    assert_eq!(options[1]["order"], 1);
}

#[tokio::test]
async fn true_false_question_gets_generated_options() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;

    let response = app
        .post_json(
            "/quizzes",
            Some(&token),
            &json!({
                "title": unique_title("Facts"),
                "category_id": 2,
                "total_questions": 1,
                "time_limit": 1,
                "passing_score": 100,
                "questions": [
                    { "text": "Water boils at 100C at sea level.", "type": "true_false", "correct_answer": true }
                ]
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 201);
    let quiz: Value = response.json().await.unwrap();
    let options = quiz["questions"][0]["options"].as_array().unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0]["text"], "True");
    assert_eq!(options[0]["is_correct"], true);
    assert_eq!(options[1]["is_correct"], false);
}

#[tokio::test]
async fn invalid_quiz_is_rejected_without_writing_anything() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;

    let response = app
        .post_json(
            "/quizzes",
            Some(&token),
            &json!({
                "title": "",
                "category_id": 999,
                "total_questions": 3,
                "time_limit": 0,
                "passing_score": 150,
                "questions": [
                    {
                        "question_text": "Pick one",
                        "question_type": "multiple_choice",
                        "options": [
                            { "text": "A", "is_correct": true },
                            { "text": "B", "is_correct": true }
                        ]
                    }
                ]
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Validation failed");
    let errors = body["errors"].as_object().unwrap();
    for field in ["title", "category_id", "time_limit", "passing_score", "total_questions"] {
        assert!(errors.contains_key(field), "missing error for {field}: {body}");
    }
    assert!(errors.keys().any(|k| k.starts_with("questions.0")));

    let quizzes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!((quizzes, questions), (0, 0));
}

#[tokio::test]
async fn quiz_titles_are_unique() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;
    let payload = two_question_quiz(&unique_title("Dup"));
    app.create_quiz(&token, &payload).await;

    let again = app.post_json("/quizzes", Some(&token), &payload).await;

    assert_eq!(again.status().as_u16(), 422);
    let body: Value = again.json().await.unwrap();
    assert!(body["errors"]["title"].is_array());
}

#[tokio::test]
async fn creating_a_quiz_requires_authentication() {
    let app = spawn_app().await;

    let response = app
        .post_json("/quizzes", None, &two_question_quiz("Anonymous"))
        .await;

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn drafts_are_hidden_until_published() {
    let app = spawn_app().await;
    let (_, author) = app.register_user().await;
    let (_, reader) = app.register_user().await;
    let payload = two_question_quiz(&unique_title("Draft"));
    let quiz_id = app.create_quiz(&author, &payload).await;
    let path = format!("/quizzes/{}", quiz_id);

    assert_eq!(app.get(&path, Some(&author)).await.status().as_u16(), 200);

    let hidden = app.get(&path, Some(&reader)).await;
    assert_eq!(hidden.status().as_u16(), 403);
    let body: Value = hidden.json().await.unwrap();
    assert_eq!(body["message"], "This quiz is not published yet");
    assert_eq!(app.get(&path, None).await.status().as_u16(), 403);

    let listed: Vec<Value> = app.get("/quizzes", None).await.json().await.unwrap();
    assert!(listed.is_empty());

    app.publish(&author, quiz_id, &payload).await;

    let visible = app.get(&path, None).await;
    assert_eq!(visible.status().as_u16(), 200);
    let quiz: Value = visible.json().await.unwrap();
    assert_eq!(quiz["is_published"], true);
    assert!(quiz["user"]["name"].is_string());

    let listed: Vec<Value> = app.get("/quizzes", None).await.json().await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn missing_quiz_is_404() {
    let app = spawn_app().await;

    let response = app.get("/quizzes/424242", None).await;

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Quiz not found");
}

#[tokio::test]
async fn listing_filters_by_category() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;

    let history = two_question_quiz(&unique_title("History"));
    let mut science = two_question_quiz(&unique_title("Science"));
    science["category_id"] = json!(2);
    for payload in [&history, &science] {
        let id = app.create_quiz(&token, payload).await;
        app.publish(&token, id, payload).await;
    }

    let all: Vec<Value> = app.get("/quizzes", None).await.json().await.unwrap();
    assert_eq!(all.len(), 2);

    let filtered: Vec<Value> = app.get("/quizzes?category_id=2", None).await.json().await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["title"], science["title"]);
    assert_eq!(filtered[0]["category"]["name"], "Science");
}

#[tokio::test]
async fn only_the_author_may_update_or_delete() {
    let app = spawn_app().await;
    let (_, author) = app.register_user().await;
    let (_, intruder) = app.register_user().await;
    let payload = two_question_quiz(&unique_title("Mine"));
    let quiz_id = app.create_quiz(&author, &payload).await;
    let path = format!("/quizzes/{}", quiz_id);
    let before: Value = app.get(&path, Some(&author)).await.json().await.unwrap();

    let mut edited = payload.clone();
    edited["title"] = json!(unique_title("Hijacked"));
    edited["passing_score"] = json!(0);
    edited["is_published"] = json!(true);
    let forbidden = app.put_json(&path, &intruder, &edited).await;
    assert_eq!(forbidden.status().as_u16(), 403);
    assert_eq!(app.delete(&path, &intruder).await.status().as_u16(), 403);

    // Rejected writes leave the quiz and its question graph untouched.
    let after: Value = app.get(&path, Some(&author)).await.json().await.unwrap();
    for field in ["title", "description", "passing_score", "time_limit", "is_published", "total_questions", "updated_at"] {
        assert_eq!(after[field], before[field], "{field} changed");
    }
    assert_eq!(after["questions"], before["questions"]);

    edited["title"] = json!("Renamed");
    edited["description"] = json!("<b>bold</b><script>alert(1)</script>");
    let updated = app.put_json(&path, &author, &edited).await;
    assert_eq!(updated.status().as_u16(), 200);
    let quiz: Value = updated.json().await.unwrap();
    assert_eq!(quiz["title"], "Renamed");
    assert_eq!(quiz["description"], "<b>bold</b>");
}

#[tokio::test]
async fn update_ignores_a_client_supplied_total() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;
    let mut payload = two_question_quiz(&unique_title("Count"));
    let quiz_id = app.create_quiz(&token, &payload).await;

    payload["total_questions"] = json!(5);
    let response = app
        .put_json(&format!("/quizzes/{}", quiz_id), &token, &payload)
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let quiz: Value = response.json().await.unwrap();
    assert_eq!(quiz["total_questions"], 2);
}

#[tokio::test]
async fn quiz_emptied_of_questions_can_still_be_edited() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;
    let payload = two_question_quiz(&unique_title("Hollow"));
    let quiz_id = app.create_quiz(&token, &payload).await;
    app.publish(&token, quiz_id, &payload).await;

    let questions: Vec<Value> = app
        .get(&format!("/quizzes/{}/questions", quiz_id), Some(&token))
        .await
        .json()
        .await
        .unwrap();
    for question in &questions {
        let id = question["id"].as_i64().unwrap();
        assert_eq!(app.delete(&format!("/questions/{}", id), &token).await.status().as_u16(), 204);
    }

    let mut edited = payload.clone();
    edited["title"] = json!("Hollow, renamed");
    edited["is_published"] = json!(false);
    let response = app
        .put_json(&format!("/quizzes/{}", quiz_id), &token, &edited)
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let quiz: Value = response.json().await.unwrap();
    assert_eq!(quiz["title"], "Hollow, renamed");
    assert_eq!(quiz["is_published"], false);
    assert_eq!(quiz["total_questions"], 0);
    assert_eq!(quiz["questions"], json!([]));
}

#[tokio::test]
async fn deleting_a_quiz_removes_its_questions_options_and_attempts() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;
    let payload = two_question_quiz(&unique_title("Doomed"));
    let quiz_id = app.create_quiz(&token, &payload).await;

    app.post_json(
        &format!("/quizzes/{}/attempts", quiz_id),
        Some(&token),
        &json!({ "answers": {}, "time_taken": 3 }),
    )
    .await;

    let response = app.delete(&format!("/quizzes/{}", quiz_id), &token).await;
    assert_eq!(response.status().as_u16(), 204);

    for table in ["questions", "options", "quiz_attempts"] {
        let remaining: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&app.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0, "{table} not cascaded");
    }
    assert_eq!(
        app.get(&format!("/quizzes/{}", quiz_id), Some(&token)).await.status().as_u16(),
        404
    );
}

#[tokio::test]
async fn my_quizzes_are_paginated_newest_first() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;
    let (_, other) = app.register_user().await;
    app.create_quiz(&other, &two_question_quiz(&unique_title("Foreign"))).await;

    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(app.create_quiz(&token, &two_question_quiz(&format!("Mine {}", i))).await);
    }

    let page: Value = app.get("/my-quizzes?per_page=2", Some(&token)).await.json().await.unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["per_page"], 2);
    assert_eq!(page["current_page"], 1);
    assert_eq!(page["last_page"], 2);
    let data = page["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"], ids[2]);
    assert_eq!(data[0]["questions_count"], 2);

    let second: Value = app
        .get("/my-quizzes?per_page=2&page=2", Some(&token))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(second["data"].as_array().unwrap().len(), 1);
    assert_eq!(second["data"][0]["id"], ids[0]);

    assert_eq!(app.get("/my-quizzes", None).await.status().as_u16(), 401);
}

#[tokio::test]
async fn my_quizzes_tolerates_absurd_page_numbers() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;
    app.create_quiz(&token, &two_question_quiz(&unique_title("Far"))).await;

    let response = app
        .get("/my-quizzes?page=9223372036854775807&per_page=100", Some(&token))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let page: Value = response.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"], json!([]));
}

#[tokio::test]
async fn start_hands_out_the_paper_without_the_answer_key() {
    let app = spawn_app().await;
    let (_, token) = app.register_user().await;
    let payload = two_question_quiz(&unique_title("Paper"));
    let quiz_id = app.create_quiz(&token, &payload).await;
    app.publish(&token, quiz_id, &payload).await;

    let response = app.get(&format!("/quizzes/{}/start", quiz_id), None).await;

    assert_eq!(response.status().as_u16(), 200);
    let paper: Value = response.json().await.unwrap();
    assert_eq!(paper["time_limit_seconds"], 300);
    let questions = paper["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    for option in questions[0]["options"].as_array().unwrap() {
        assert!(option.get("is_correct").is_none());
    }
}
