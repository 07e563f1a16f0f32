//! OpenAPI response components for the shared error body.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Bad Request - one or more fields failed validation",
    content_type = "application/json",
    example = json!({
        "timestamp": "2024-05-01T10:00:00Z",
        "status": 400,
        "error": "Bad Request",
        "message": "Validation error",
        "details": {
            "email": "Email format is invalid",
            "name": "Name must not be blank"
        },
        "path": "/api/v1/users"
    })
)]
pub struct BadRequestValidationResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - malformed path or query parameter",
    content_type = "application/json",
    example = json!({
        "timestamp": "2024-05-01T10:00:00Z",
        "status": 400,
        "error": "Bad Request",
        "message": "Invalid id: abc",
        "path": "/api/v1/users/abc"
    })
)]
pub struct BadRequestResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Resource not found",
    content_type = "application/json",
    example = json!({
        "timestamp": "2024-05-01T10:00:00Z",
        "status": 404,
        "error": "Not Found",
        "message": "User not found with id: 42",
        "path": "/api/v1/users/42"
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Conflict - email already in use",
    content_type = "application/json",
    example = json!({
        "timestamp": "2024-05-01T10:00:00Z",
        "status": 409,
        "error": "Conflict",
        "message": "User with email 'ivan@example.com' already exists",
        "path": "/api/v1/users"
    })
)]
pub struct ConflictResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "timestamp": "2024-05-01T10:00:00Z",
        "status": 500,
        "error": "Internal Server Error",
        "message": "Internal server error",
        "path": "/api/v1/users"
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);
