// src/error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failures surfaced to the caller before the event stream opens.
///
/// Every variant renders as `{"error": "..."}`. Once the stream is open
/// nothing here can be reported anymore.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("OpenRouter API key not configured")]
    Unconfigured,

    /// Non-2xx from the completion API, passed through verbatim.
    #[error("upstream rejected request with status {status}")]
    UpstreamRejected { status: u16, body: String },

    #[error("Request timeout")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UpstreamRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::UpstreamRejected { body, .. } => body,
            AppError::Internal(detail) => {
                tracing::error!("Chat error: {detail}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
