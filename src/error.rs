use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::cors::apply_cors;

/// Application-wide error types with appropriate HTTP status codes.
///
/// Rejections that are part of normal admission control (401, 403) are built
/// directly as responses by the middleware and never go through this type.
/// `AppError` covers startup problems and failures talking to upstream.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl AppError {
    /// Status code reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full error details server-side for debugging
        // but only expose sanitized messages to clients
        tracing::error!(error = %self, "Request failed");

        let status = self.status();
        let (error_type, message) = match &self {
            AppError::Upstream(e) if e.is_timeout() => (
                "upstream_timeout",
                "The upstream API did not respond in time. Please try again.",
            ),
            AppError::Upstream(_) => (
                "upstream_unavailable",
                "The upstream API could not be reached. Please try again later.",
            ),
            AppError::ConfigError(_) => (
                "config_error",
                "Service configuration error. Please contact the operator.",
            ),
            AppError::Internal(_) => (
                "internal_error",
                "An internal error occurred. Please contact the operator if the issue persists.",
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: message.to_string(),
        };

        let mut response = (status, axum::Json(body)).into_response();
        apply_cors(response.headers_mut());
        response
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
