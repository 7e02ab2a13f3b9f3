use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A validation error with a single message.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A payload that failed schema validation, with the individual issues.
    #[error("Invalid request payload")]
    InvalidPayload(Vec<String>),

    /// A rate limit exceeded error.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// A missing or malformed server-side configuration value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A transport-level upstream failure (network error, timeout, retries exhausted).
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A non-2xx response from a payment provider. The provider's own status
    /// code is passed through to the caller with the response body as details.
    #[error("Provider error: {status}")]
    Provider { status: u16, details: String },

    /// A non-2xx response from the record store.
    #[error("Record store error: {status}")]
    RecordStore { status: u16, body: String },

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Upstream(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    sonic_rs::json!({ "success": false, "error": msg }),
                )
            }

            AppError::InvalidPayload(ref issues) => {
                tracing::debug!("Invalid payload: {:?}", issues);
                (
                    StatusCode::BAD_REQUEST,
                    sonic_rs::json!({
                        "success": false,
                        "error": "Invalid request payload",
                        "issues": issues,
                    }),
                )
            }

            AppError::RateLimitExceeded(ref msg) => {
                tracing::warn!("Rate limit exceeded: {}", msg);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    sonic_rs::json!({ "success": false, "error": "Too many requests" }),
                )
            }

            AppError::Configuration(ref msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    sonic_rs::json!({ "success": false, "error": msg }),
                )
            }

            AppError::Upstream(ref msg) => {
                tracing::error!("Upstream error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    sonic_rs::json!({ "success": false, "error": "Upstream request failed" }),
                )
            }

            AppError::Provider { status, ref details } => {
                tracing::warn!("Provider error {}: {}", status, details);
                (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    sonic_rs::json!({
                        "success": false,
                        "error": format!("Payment provider error: {}", status),
                        "details": details,
                    }),
                )
            }

            AppError::RecordStore { status, ref body } => {
                tracing::error!("Record store error {}: {}", status, body);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    sonic_rs::json!({ "success": false, "error": "Record store request failed" }),
                )
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (
                    StatusCode::NOT_FOUND,
                    sonic_rs::json!({ "success": false, "error": "Resource not found" }),
                )
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    sonic_rs::json!({ "success": false, "error": "Internal server error" }),
                )
            }
        };

        let body = sonic_rs::to_string(&body)
            .unwrap_or_else(|_| r#"{"success":false,"error":"Internal server error"}"#.to_string());

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
