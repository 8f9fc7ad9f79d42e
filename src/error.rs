/// Unified error types for the clipstream account service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::FieldError;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Validation failure carrying every failing field
    #[error("Validation failed for {} field(s)", .0.len())]
    FieldValidation(Vec<FieldError>),

    /// Bad credentials, invalid/expired/replayed token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No matching account, channel, or content
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate username/email or subscription edge
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Blob storage errors
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response envelope
///
/// Mirrors the success envelope shape (`statusCode`/`message`/`success`) so
/// clients can branch on `success` alone. `errors` lists individual field
/// failures for multi-field validation errors.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub message: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// Convert AppError to an HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string(), Vec::new()),
            AppError::FieldValidation(fields) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                fields,
            ),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string(), Vec::new()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), Vec::new()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string(), Vec::new()),
            AppError::Database(_)
            | AppError::BlobStorage(_)
            | AppError::Io(_)
            | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(), // Don't leak details
                Vec::new(),
            ),
        };

        let body = Json(ErrorResponse {
            status_code: status.as_u16(),
            message,
            success: false,
            errors,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type AppResult<T> = Result<T, AppError>;
