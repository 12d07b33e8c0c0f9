//! Error types for PEP operations

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// PEP-specific error type
#[derive(Debug, thiserror::Error)]
pub enum PepError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Key set fetch error: {0}")]
    KeySetFetch(String),

    #[error("Key set fetch timed out after {0:?}")]
    KeySetTimeout(std::time::Duration),

    #[error("Unprocessable request")]
    Unprocessable,
}

pub type Result<T> = std::result::Result<T, PepError>;

impl PepError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PepError::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            PepError::KeySetFetch(_) | PepError::KeySetTimeout(_) => StatusCode::BAD_GATEWAY,
            PepError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to a caller. Never includes the underlying cause.
    pub fn public_message(&self) -> &'static str {
        match self {
            PepError::Unprocessable => "Not processable",
            PepError::KeySetFetch(_) | PepError::KeySetTimeout(_) => "Bad gateway",
            PepError::Config(_) => "Internal server error",
        }
    }
}

impl IntoResponse for PepError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.public_message())
    }
}

/// Render the `{"success": false, "error": <status>, "message": ...}` envelope.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    let body = json!({
        "success": false,
        "error": status.as_u16(),
        "message": message,
    });
    (status, Json(body)).into_response()
}
