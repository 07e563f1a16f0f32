pub mod handlers;
pub mod responses;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

pub const MSG_VALIDATION: &str = "Validation error";
pub const MSG_INTERNAL: &str = "Internal server error";

/// Error body returned for every non-2xx response.
///
/// ```json
/// {
///   "timestamp": "2024-05-01T10:00:00Z",
///   "status": 400,
///   "error": "Bad Request",
///   "message": "Validation error",
///   "details": { "email": "Email format is invalid" },
///   "path": "/api/v1/users"
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    /// HTTP status code
    pub status: u16,
    /// Reason phrase for `status`
    pub error: String,
    pub message: String,
    /// Field name to message, only for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
    /// Request path, filled in by [`handlers::attach_request_path`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
            details: None,
            path: None,
        }
    }

    pub fn with_details(mut self, details: BTreeMap<String, String>) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Kept in extensions so middleware can rewrite the body with the request path
        let mut response = (status, Json(self.clone())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// HTTP-facing error type.
///
/// Domain crates convert their own errors into this one; `Store` and
/// `Unhandled` never leak their detail to the caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    /// Field-level failures from collect-all validation
    #[error("Validation failed: {0:?}")]
    Validation(BTreeMap<String, String>),

    #[error("JSON extraction error: {0}")]
    JsonRejection(#[from] JsonRejection),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Unhandled error: {0}")]
    Unhandled(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            // Unparseable or mistyped bodies are client input errors, not 422
            AppError::JsonRejection(
                JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_),
            ) => StatusCode::BAD_REQUEST,
            AppError::JsonRejection(e) => e.status(),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        let status = self.status();
        match self {
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                ErrorResponse::new(status, msg.clone())
            }
            AppError::Validation(details) => {
                ErrorResponse::new(status, MSG_VALIDATION).with_details(details.clone())
            }
            AppError::JsonRejection(e) => ErrorResponse::new(status, e.body_text()),
            AppError::Store(_) | AppError::Unhandled(_) => ErrorResponse::new(status, MSG_INTERNAL),
        }
    }
}

impl From<ValidationErrors> for AppError {
    /// Keeps the first message reported for each field.
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .filter_map(|(field, errs)| {
                errs.first().map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    (field.to_string(), message)
                })
            })
            .collect();

        AppError::Validation(details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Store(detail) => tracing::error!(error = %detail, "Store failure"),
            AppError::Unhandled(detail) => tracing::error!(error = %detail, "Unhandled failure"),
            AppError::Validation(details) => tracing::info!(?details, "Validation failed"),
            AppError::JsonRejection(e) => tracing::warn!(error = %e, "Rejected request body"),
            other => tracing::info!(status = %other.status(), "{}", other),
        }

        self.to_error_response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Validation(BTreeMap::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Store("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::Unhandled("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let body = AppError::Store("relation \"users\" does not exist".into()).to_error_response();
        assert_eq!(body.status, 500);
        assert_eq!(body.error, "Internal Server Error");
        assert_eq!(body.message, MSG_INTERNAL);
        assert!(body.details.is_none());
    }

    #[test]
    fn test_caller_errors_keep_message() {
        let body = AppError::Conflict("Email already in use: a@b.com".into()).to_error_response();
        assert_eq!(body.status, 409);
        assert_eq!(body.error, "Conflict");
        assert_eq!(body.message, "Email already in use: a@b.com");
    }

    #[test]
    fn test_validation_errors_collect_first_message_per_field() {
        let mut errors = ValidationErrors::new();
        let mut name = ValidationError::new("length");
        name.message = Some("Name is too short".into());
        errors.add("name", name);
        errors.add("age", ValidationError::new("range"));

        let body = AppError::from(errors).to_error_response();
        let details = body.details.unwrap();
        assert_eq!(body.message, MSG_VALIDATION);
        assert_eq!(details["name"], "Name is too short");
        assert_eq!(details["age"], "range");
    }

    #[test]
    fn test_error_response_serializes_without_empty_optionals() {
        let json = serde_json::to_value(ErrorResponse::new(StatusCode::NOT_FOUND, "gone")).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "Not Found");
        assert!(json.get("details").is_none());
        assert!(json.get("path").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_into_response_stores_body_in_extensions() {
        let response = AppError::NotFound("User not found with id: 9".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let stored = response.extensions().get::<ErrorResponse>().unwrap();
        assert_eq!(stored.message, "User not found with id: 9");
    }
}
