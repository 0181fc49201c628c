// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    error::FieldErrors,
    models::{
        category::Category,
        question::{NewQuestionRequest, PublicQuestion, QuestionDraft, QuestionWithOptions},
        user::User,
    },
    utils::validation::push_error,
};

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category_id: i64,

    /// Author. Only the author may edit, delete or see the quiz while unpublished.
    pub user_id: i64,

    /// Declared question count, kept equal to the actual count.
    pub total_questions: i64,

    /// Minutes.
    pub time_limit: i64,

    /// Percentage (0-100) required to pass.
    pub passing_score: i64,

    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub const QUIZ_COLUMNS: &str = "id, title, description, category_id, user_id, total_questions, \
     time_limit, passing_score, is_published, created_at, updated_at";

impl Quiz {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    /// Published quizzes are world-readable; drafts only by their author.
    pub fn is_visible_to(&self, viewer: Option<i64>) -> bool {
        self.is_published || viewer.is_some_and(|id| self.is_owned_by(id))
    }

    /// Countdown length for a quiz run.
    pub fn time_limit_seconds(&self) -> u32 {
        u32::try_from(self.time_limit)
            .unwrap_or(0)
            .saturating_mul(60)
    }
}

/// A quiz with its category, author and questions (each with options).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub questions: Vec<QuestionWithOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_count: Option<i64>,
}

/// DTO for creating a quiz together with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(
        required(message = "The quiz title is required."),
        length(min = 1, max = 255, message = "The quiz title must be between 1 and 255 characters.")
    )]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "The description cannot exceed 1000 characters."))]
    pub description: Option<String>,

    #[validate(required(message = "Please select a category."))]
    pub category_id: Option<i64>,

    #[validate(
        required(message = "Please specify the number of questions."),
        range(min = 1, message = "A quiz must declare at least one question.")
    )]
    pub total_questions: Option<i64>,

    #[validate(
        required(message = "Please specify the time limit."),
        range(min = 1, max = 120, message = "Time limit must be between 1 and 120 minutes.")
    )]
    pub time_limit: Option<i64>,

    #[validate(
        required(message = "Please specify the passing score."),
        range(min = 0, max = 100, message = "Passing score must be between 0 and 100.")
    )]
    pub passing_score: Option<i64>,

    #[serde(default)]
    #[validate(
        length(min = 1, message = "The quiz must have at least one question."),
        nested
    )]
    pub questions: Vec<NewQuestionRequest>,
}

/// A validated quiz about to be inserted.
#[derive(Debug, Clone)]
pub struct QuizDraft {
    pub title: String,
    pub description: Option<String>,
    pub category_id: i64,
    pub total_questions: i64,
    pub time_limit: i64,
    pub passing_score: i64,
    pub questions: Vec<QuestionDraft>,
}

impl CreateQuizRequest {
    /// Invariants spanning several fields or nested questions.
    pub fn shape_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if let Some(total) = self.total_questions {
            if total >= 1 && !self.questions.is_empty() && total != self.questions.len() as i64 {
                push_error(
                    &mut errors,
                    "total_questions",
                    "The declared question count must match the number of questions supplied.",
                );
            }
        }

        for (index, question) in self.questions.iter().enumerate() {
            question.shape_errors(&format!("questions.{index}"), &mut errors);
        }

        errors
    }

    pub fn into_draft(self) -> Option<QuizDraft> {
        Some(QuizDraft {
            title: self.title?,
            description: self.description,
            category_id: self.category_id?,
            total_questions: self.total_questions?,
            time_limit: self.time_limit?,
            passing_score: self.passing_score?,
            questions: self
                .questions
                .into_iter()
                .map(NewQuestionRequest::into_draft)
                .collect::<Option<Vec<_>>>()?,
        })
    }
}

/// DTO for updating a quiz's own fields. Questions are managed separately, so
/// `total_questions` is not accepted here: it always follows the stored rows.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(
        required(message = "The quiz title is required."),
        length(min = 1, max = 255, message = "The quiz title must be between 1 and 255 characters.")
    )]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "The description cannot exceed 1000 characters."))]
    pub description: Option<String>,

    #[validate(required(message = "Please select a category."))]
    pub category_id: Option<i64>,

    #[validate(
        required(message = "Please specify the time limit."),
        range(min = 1, max = 120, message = "Time limit must be between 1 and 120 minutes.")
    )]
    pub time_limit: Option<i64>,

    #[validate(
        required(message = "Please specify the passing score."),
        range(min = 0, max = 100, message = "Passing score must be between 0 and 100.")
    )]
    pub passing_score: Option<i64>,

    /// Absent means "leave as is".
    pub is_published: Option<bool>,
}

/// Query parameters for the public quiz listing.
#[derive(Debug, Deserialize)]
pub struct ListQuizzesParams {
    pub category_id: Option<i64>,
}

/// Page-number pagination parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageParams {
    pub const DEFAULT_PER_PAGE: i64 = 10;
    pub const MAX_PER_PAGE: i64 = 100;
    pub const MAX_PAGE: i64 = 1_000_000;

    /// `(page, per_page)`, both at least 1. Bounded so the row offset cannot overflow.
    pub fn resolve(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, Self::MAX_PAGE);
        let per_page = self
            .per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE);
        (page, per_page)
    }
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, current_page: i64, per_page: i64, total: i64) -> Self {
        let last_page = ((total + per_page - 1) / per_page).max(1);
        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
        }
    }
}

/// What a quiz taker receives when starting a run: no answer key.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuizPaper {
    pub quiz_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: i64,
    /// Minutes, as configured.
    pub time_limit: i64,
    /// Countdown length the client should use.
    pub time_limit_seconds: u32,
    pub questions: Vec<PublicQuestion>,
}

impl From<&QuizDetail> for QuizPaper {
    fn from(detail: &QuizDetail) -> Self {
        Self {
            quiz_id: detail.quiz.id,
            title: detail.quiz.title.clone(),
            description: detail.quiz.description.clone(),
            passing_score: detail.quiz.passing_score,
            time_limit: detail.quiz.time_limit,
            time_limit_seconds: detail.quiz.time_limit_seconds(),
            questions: detail.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}
