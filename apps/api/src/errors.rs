use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::speech::SpeechError;
use crate::tracker::export::ExportError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Speech(e) => {
                let (status, code) = match e {
                    SpeechError::NotConfigured => {
                        (StatusCode::SERVICE_UNAVAILABLE, "SPEECH_DISABLED")
                    }
                    SpeechError::EmptyText => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    SpeechError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "SPEECH_RATE_LIMITED"),
                    SpeechError::InvalidKey
                    | SpeechError::InvalidVoice
                    | SpeechError::Api { .. }
                    | SpeechError::Http(_) => {
                        tracing::error!("Speech error: {e}");
                        (StatusCode::BAD_GATEWAY, "SPEECH_ERROR")
                    }
                };
                (status, code, e.to_string())
            }
            AppError::Export(e) => match e {
                ExportError::NoOpportunities => {
                    (StatusCode::NOT_FOUND, "NO_OPPORTUNITIES", e.to_string())
                }
                _ => {
                    tracing::error!("Export error: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "EXPORT_ERROR",
                        "The CSV export could not be produced".to_string(),
                    )
                }
            },
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
