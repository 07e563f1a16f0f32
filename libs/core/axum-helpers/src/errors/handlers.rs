use axum::{
    body::Body,
    extract::{OriginalUri, Request},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;

use super::{AppError, ErrorResponse};

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    ErrorResponse::new(StatusCode::NOT_FOUND, "Resource not found").into_response()
}

/// Rewrites error bodies produced by [`ErrorResponse`] so they carry the request path.
///
/// Uses the path the client sent, before any `nest` stripped a prefix.
pub async fn attach_request_path(request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    let Some(error) = response.extensions().get::<ErrorResponse>() else {
        return response;
    };
    if error.path.is_some() {
        return response;
    }

    let mut error = error.clone();
    error.path = Some(path);

    let body = match serde_json::to_vec(&error) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Failed to re-serialize error body");
            return response;
        }
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.extensions.insert(error);
    Response::from_parts(parts, Body::from(body))
}

/// Turns a handler panic into a 500 with the standard error body.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::Unhandled(format!("handler panicked: {}", detail)).into_response()
}
