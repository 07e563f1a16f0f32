use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

use crate::validation::FieldError;

#[derive(Debug, Error)]
pub enum UserError {
    /// Fail-fast validation failure
    #[error("{}", .0.message)]
    Validation(FieldError),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("User not found with id: {0}")]
    NotFound(i64),

    #[error("User not found with email: {0}")]
    EmailNotFound(String),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        UserError::Store(err.to_string())
    }

    /// Caller-fixable input problem
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, UserError::Validation(_) | UserError::MissingParameter(_))
    }
}

impl From<FieldError> for UserError {
    fn from(err: FieldError) -> Self {
        UserError::Validation(err)
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(_) | UserError::MissingParameter(_) => {
                AppError::BadRequest(err.to_string())
            }
            UserError::NotFound(_) | UserError::EmailNotFound(_) => AppError::NotFound(err.to_string()),
            UserError::DuplicateEmail(_) => AppError::Conflict(err.to_string()),
            UserError::Store(detail) => AppError::Store(detail),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
