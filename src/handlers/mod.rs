pub mod health;
pub mod model;
pub mod predict;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    /// Request parsed but failed field validation.
    Validation(String),
    /// Scoring context is not available yet (or any more).
    NotReady { retry_after_secs: u64 },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": message })),
            )
                .into_response(),
            AppError::NotReady { retry_after_secs } => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(json!({
                    "error": "delay model is not ready",
                    "retry_after_secs": retry_after_secs,
                })),
            )
                .into_response(),
        }
    }
}
