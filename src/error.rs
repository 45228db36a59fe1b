//! Domain error types for the audit orchestrator.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Artifact storage (S3) operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A worker could not be launched for a region
    #[error("Launch error: {0}")]
    Launch(String),

    /// The audit measurement itself failed
    #[error("Audit error: {0}")]
    Audit(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            AppError::Launch(_) => (StatusCode::BAD_GATEWAY, "LAUNCH_FAILED"),
            AppError::Audit(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUDIT_FAILED"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, error_code) = self.status_and_code();
        let message = match self {
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                "An internal database error occurred".to_string()
            }
            AppError::Launch(err_str) => {
                tracing::error!("Launch error: {}", err_str);
                self.to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code.to_string(),
            message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid UUID: {}", err))
    }
}
