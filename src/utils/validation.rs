//! Request body extraction and validation error reporting.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use url::Url;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{AppError, FieldErrors};

/// JSON body extractor whose rejections use the application error envelope.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            // Well-formed JSON of the wrong shape (e.g. a string where a number belongs).
            Err(JsonRejection::JsonDataError(e)) => Err(AppError::field("body", e.body_text())),
            Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
        }
    }
}

/// JSON body extractor that also runs the payload's `Validate` rules.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    AppJson<T>: FromRequest<S, Rejection = AppError>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
        value
            .validate()
            .map_err(|errors| AppError::Validation(field_errors(&errors)))?;
        Ok(ValidatedJson(value))
    }
}

/// Flattens `validator` output into `field.path -> [messages]`.
///
/// Nested structs and lists become dotted paths: `questions.0.options.1.text`.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    flatten(None, errors, &mut out);
    out
}

fn flatten(prefix: Option<&str>, errors: &ValidationErrors, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let key = match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages = list.iter().map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("The {field} field is invalid ({}).", e.code),
                });
                out.entry(key).or_default().extend(messages);
            }
            ValidationErrorsKind::Struct(inner) => flatten(Some(&key), inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(Some(&format!("{key}.{index}")), inner, out);
                }
            }
        }
    }
}

/// Runs a payload's declarative rules, collecting instead of failing.
pub fn collect<T: Validate>(payload: &T) -> FieldErrors {
    payload
        .validate()
        .err()
        .map(|errors| field_errors(&errors))
        .unwrap_or_default()
}

pub fn push_error(errors: &mut FieldErrors, field: impl Into<String>, message: impl Into<String>) {
    errors.entry(field.into()).or_default().push(message.into());
}

/// `Ok(())` when nothing was reported.
pub fn finish(errors: FieldErrors) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Whether a media link is an absolute URL.
pub fn is_valid_url(candidate: &str) -> bool {
    Url::parse(candidate).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Child {
        #[validate(length(min = 1, message = "Text is required."))]
        text: String,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Parent {
        #[validate(range(min = 1, message = "Too small."))]
        count: i64,
        #[validate(nested)]
        children: Vec<Child>,
    }

    #[test]
    fn nested_errors_use_dotted_paths() {
        let parent = Parent {
            count: 0,
            children: vec![
                Child { text: "ok".into() },
                Child { text: String::new() },
            ],
        };

        let errors = collect(&parent);
        assert_eq!(errors.get("count"), Some(&vec!["Too small.".to_string()]));
        assert_eq!(
            errors.get("children.1.text"),
            Some(&vec!["Text is required.".to_string()])
        );
        assert!(!errors.contains_key("children.0.text"));
    }

    #[test]
    fn finish_passes_when_empty() {
        assert!(finish(FieldErrors::new()).is_ok());

        let mut errors = FieldErrors::new();
        push_error(&mut errors, "title", "taken");
        push_error(&mut errors, "title", "too long");
        match finish(errors) {
            Err(AppError::Validation(errors)) => assert_eq!(errors["title"].len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn url_check() {
        assert!(is_valid_url("https://cdn.example.com/a.png"));
        assert!(!is_valid_url("not a url"));
    }
}
