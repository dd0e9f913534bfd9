use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Clients only see `{ "error": "<message>" }`; the status code is the failure class.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid sessionId")]
    InvalidSession,

    #[error("Gemini not configured")]
    NotConfigured,

    #[error("Gemini model not available: {0}")]
    ModelUnavailable(String),

    #[error("{0}")]
    Llm(String),

    #[error("{0}")]
    MalformedOutput(String),

    #[error("Session error: {0}")]
    Session(SessionError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps a failed model interaction onto the error taxonomy.
    /// `action` reads like "Failed to generate questions".
    pub fn from_llm(action: &str, error: LlmError) -> Self {
        match error {
            LlmError::NoWorkingModel => AppError::ModelUnavailable(error.to_string()),
            LlmError::Parse(e) => {
                AppError::MalformedOutput(format!("{action}: model returned malformed JSON ({e})"))
            }
            other => AppError::Llm(format!("{action}: {other}")),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidSession => StatusCode::BAD_REQUEST,
            AppError::NotConfigured
            | AppError::ModelUnavailable(_)
            | AppError::Llm(_)
            | AppError::MalformedOutput(_)
            | AppError::Session(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::InvalidSession,
            other => AppError::Session(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Session(e) => {
                tracing::error!("Session error: {e}");
                "A session storage error occurred".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            other if status.is_server_error() => {
                tracing::error!("{other}");
                other.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
