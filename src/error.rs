use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::rate_limit::RateLimitExceeded;

/// AppError
///
/// The gateway's failure taxonomy. Validation and authorization failures are
/// recovered locally into structured envelope responses; only `Internal` marks
/// a truly unexpected fault, which is logged server-side and never leaks
/// detail to the client payload.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No token, an invalid/expired token, or a token for an unknown user.
    #[error("{0}")]
    Unauthenticated(String),

    /// Valid identity, wrong role for the requested resource.
    #[error("{0}")]
    Forbidden(String),

    /// Admission ceiling exceeded for this client.
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    /// Bad upload type/size, missing required field, or other client error.
    #[error("{0}")]
    Validation(String),

    /// Multipart/stream-level upload failure, distinguished from plain
    /// validation errors by a dedicated error tag in the envelope.
    #[error("file upload error: {0}")]
    Upload(String),

    /// Unknown route or resource.
    #[error("{0}")]
    NotFound(String),

    /// Unexpected handler fault.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            AppError::RateLimited(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                "too many requests, please try again later".to_string(),
                None,
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Upload(msg) => (
                StatusCode::BAD_REQUEST,
                "file upload error".to_string(),
                Some(msg.clone()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "unhandled internal fault");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "success": false,
            "error": error,
        });
        if let Some(message) = message {
            body["message"] = json!(message);
        }

        let mut response = (status, Json(body)).into_response();

        // Throttled clients get a retry hint alongside the envelope.
        if let AppError::RateLimited(rejection) = &self {
            if let Ok(value) = rejection.retry_after_secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
