// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::{
    error::FieldErrors,
    models::option::{NewOptionRequest, OptionDraft, PublicOption, QuestionOption},
    utils::validation::{is_valid_url, push_error},
};

/// Question kinds known to the service.
///
/// Only `multiple_choice` and `true_false` are accepted when a quiz is created
/// with nested questions; the media kinds exist for the authoring UI and may be
/// attached through the standalone question endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    Image,
    Video,
    Audio,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Image => "image",
            QuestionType::Video => "video",
            QuestionType::Audio => "audio",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "true_false" => Some(QuestionType::TrueFalse),
            "image" => Some(QuestionType::Image),
            "video" => Some(QuestionType::Video),
            "audio" => Some(QuestionType::Audio),
            _ => None,
        }
    }

    /// Whether the kind may appear in a nested quiz creation payload.
    pub fn is_core(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,

    /// Stored as text, see [`QuestionType`].
    pub question_type: String,

    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub points: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub const QUESTION_COLUMNS: &str =
    "id, quiz_id, question_text, question_type, image_url, audio_url, points, created_at, updated_at";

/// A question together with its options, ordered for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuestionOption>,
}

/// DTO for sending a question to a quiz taker (no correctness flags).
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub question_type: String,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub points: i64,
    pub options: Vec<PublicOption>,
}

impl From<&QuestionWithOptions> for PublicQuestion {
    fn from(q: &QuestionWithOptions) -> Self {
        Self {
            id: q.question.id,
            question_text: q.question.question_text.clone(),
            question_type: q.question.question_type.clone(),
            image_url: q.question.image_url.clone(),
            audio_url: q.question.audio_url.clone(),
            points: q.question.points,
            options: q.options.iter().map(PublicOption::from).collect(),
        }
    }
}

/// A question nested inside a quiz creation payload.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewQuestionRequest {
    #[serde(alias = "text")]
    #[validate(
        required(message = "Question text is required."),
        length(min = 1, max = 1000, message = "Question text must be between 1 and 1000 characters.")
    )]
    pub question_text: Option<String>,

    #[serde(alias = "type")]
    #[validate(required(message = "Question type is required."))]
    pub question_type: Option<String>,

    #[validate(range(min = 1, message = "Points must be at least 1."))]
    pub points: Option<i64>,

    #[validate(length(max = 2048, message = "Image URL cannot exceed 2048 characters."))]
    pub image_url: Option<String>,

    #[validate(length(max = 2048, message = "Audio URL cannot exceed 2048 characters."))]
    pub audio_url: Option<String>,

    /// For `true_false` questions without explicit options.
    pub correct_answer: Option<bool>,

    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<NewOptionRequest>,
}

/// DTO for creating or replacing a standalone question.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(required(message = "The quiz_id field is required."))]
    pub quiz_id: Option<i64>,

    #[validate(
        required(message = "Question text is required."),
        length(min = 1, max = 1000, message = "Question text must be between 1 and 1000 characters.")
    )]
    pub question_text: Option<String>,

    #[validate(required(message = "Question type is required."))]
    pub question_type: Option<String>,

    #[validate(
        required(message = "The points field is required."),
        range(min = 0, message = "Points cannot be negative.")
    )]
    pub points: Option<i64>,

    #[validate(length(max = 2048, message = "Image URL cannot exceed 2048 characters."))]
    pub image_url: Option<String>,

    #[validate(length(max = 2048, message = "Audio URL cannot exceed 2048 characters."))]
    pub audio_url: Option<String>,
}

/// A validated question about to be inserted along with its options.
#[derive(Debug, Clone)]
pub struct QuestionDraft {
    pub question_text: String,
    pub question_type: QuestionType,
    pub points: i64,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub options: Vec<OptionDraft>,
}

impl NewQuestionRequest {
    /// Cross-field rules the declarative attributes cannot express.
    ///
    /// `prefix` is the question's path in the payload, e.g. `questions.2`.
    pub fn shape_errors(&self, prefix: &str, errors: &mut FieldErrors) {
        for (field, url) in [("image_url", &self.image_url), ("audio_url", &self.audio_url)] {
            if let Some(url) = url {
                if !is_valid_url(url) {
                    push_error(errors, format!("{prefix}.{field}"), "The media link must be a valid URL.");
                }
            }
        }

        let Some(raw) = self.question_type.as_deref() else {
            return;
        };
        let kind = match QuestionType::parse(raw) {
            Some(kind) if kind.is_core() => kind,
            _ => {
                push_error(
                    errors,
                    format!("{prefix}.question_type"),
                    "The selected question type is invalid.",
                );
                return;
            }
        };

        let options_key = format!("{prefix}.options");
        let correct = self
            .options
            .iter()
            .filter(|o| o.is_correct == Some(true))
            .count();

        match kind {
            QuestionType::MultipleChoice => {
                if self.options.len() < 2 {
                    push_error(
                        errors,
                        options_key,
                        "Multiple choice questions must have at least two options.",
                    );
                } else if correct != 1 {
                    push_error(
                        errors,
                        options_key,
                        "Multiple choice questions must have exactly one correct option.",
                    );
                }
            }
            QuestionType::TrueFalse if self.options.is_empty() => {
                if self.correct_answer.is_none() {
                    push_error(
                        errors,
                        format!("{prefix}.correct_answer"),
                        "Please specify the correct answer for true/false questions.",
                    );
                }
            }
            QuestionType::TrueFalse => {
                if self.options.len() != 2 || correct != 1 {
                    push_error(
                        errors,
                        options_key,
                        "True/false questions must have two options, exactly one of them correct.",
                    );
                }
            }
            _ => {}
        }
    }

    /// Converts a payload that passed validation. `None` if a required part is missing.
    pub fn into_draft(self) -> Option<QuestionDraft> {
        let question_type = QuestionType::parse(self.question_type.as_deref()?)?;

        let options = if question_type == QuestionType::TrueFalse && self.options.is_empty() {
            let answer = self.correct_answer?;
            vec![
                OptionDraft { text: "True".to_string(), is_correct: answer },
                OptionDraft { text: "False".to_string(), is_correct: !answer },
            ]
        } else {
            self.options
                .into_iter()
                .map(NewOptionRequest::into_draft)
                .collect::<Option<Vec<_>>>()?
        };

        Some(QuestionDraft {
            question_text: self.question_text?,
            question_type,
            points: self.points.unwrap_or(1),
            image_url: self.image_url,
            audio_url: self.audio_url,
            options,
        })
    }
}
