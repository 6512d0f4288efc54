use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::detection::EvaluationError;
use crate::github::GitHubError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Detection error: {0}")]
    Detection(#[from] EvaluationError),

    #[error("GitHub error: {0}")]
    GitHub(#[from] GitHubError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid or missing webhook signature".to_string(),
            ),
            AppError::Detection(e) => {
                tracing::error!("Detection error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DETECTION_ERROR",
                    "Content could not be evaluated".to_string(),
                )
            }
            AppError::GitHub(e) => {
                tracing::error!("GitHub error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GITHUB_ERROR",
                    "A moderation action failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
