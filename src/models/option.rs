use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'options' table: one selectable answer of a question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,

    /// Display position within the question. Stored as `sort_order`
    /// since `order` is an SQL keyword.
    #[sqlx(rename = "sort_order")]
    #[serde(rename = "order")]
    pub order: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub const OPTION_COLUMNS: &str =
    "id, question_id, text, is_correct, sort_order, created_at, updated_at";

/// An option as shown to a quiz taker: no correctness flag.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
    pub order: i64,
}

impl From<&QuestionOption> for PublicOption {
    fn from(option: &QuestionOption) -> Self {
        Self {
            id: option.id,
            text: option.text.clone(),
            order: option.order,
        }
    }
}

/// An option nested inside a quiz creation payload.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewOptionRequest {
    #[validate(
        required(message = "Option text is required."),
        length(min = 1, max = 255, message = "Option text must be between 1 and 255 characters.")
    )]
    pub text: Option<String>,

    #[validate(required(message = "Please specify if this option is correct."))]
    pub is_correct: Option<bool>,
}

/// DTO for creating or replacing a standalone option.
#[derive(Debug, Deserialize, Validate)]
pub struct OptionRequest {
    #[validate(required(message = "The question_id field is required."))]
    pub question_id: Option<i64>,

    #[validate(
        required(message = "Option text is required."),
        length(min = 1, max = 255, message = "Option text must be between 1 and 255 characters.")
    )]
    pub text: Option<String>,

    #[validate(required(message = "Please specify if this option is correct."))]
    pub is_correct: Option<bool>,

    #[validate(range(min = 0, message = "Order cannot be negative."))]
    pub order: Option<i64>,
}

/// A validated option about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDraft {
    pub text: String,
    pub is_correct: bool,
}

impl NewOptionRequest {
    pub fn into_draft(self) -> Option<OptionDraft> {
        Some(OptionDraft {
            text: self.text?,
            is_correct: self.is_correct?,
        })
    }
}
