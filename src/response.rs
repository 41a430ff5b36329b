use axum::Json;
use axum::extract::{FromRequest, Request, rejection::JsonRejection};
use serde::Serialize;

use crate::error::AppError;

/// Envelope
///
/// The uniform `{success, data?, error?, message?}` wrapper applied to every API
/// response. Handlers return `Envelope::ok(..)` for success; failures are built
/// by the [`crate::error::AppError`] response mapping so the shape is identical
/// on both paths.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    /// Wraps a successful payload.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }
}

/// AppJson
///
/// Drop-in replacement for `axum::Json` as a request extractor. Axum's own
/// rejection for an unreadable body is a plain-text 422; routing it through
/// [`AppError::Validation`] keeps body failures on the same 400 envelope as
/// every other client error.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}
