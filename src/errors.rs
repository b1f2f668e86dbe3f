// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

use crate::services::opening_hours::HoursParseError;

/// Application-specific error types
/// DOCUMENTATION: Comprehensive error enum for all possible failures
/// Each variant maps to appropriate HTTP status code and error response
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Forbidden access")]
    Forbidden,
}

impl DirectoryError {
    fn code(&self) -> (StatusCode, &'static str) {
        match self {
            DirectoryError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            DirectoryError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            DirectoryError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
            DirectoryError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            DirectoryError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            DirectoryError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            DirectoryError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        }
    }
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DirectoryError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DirectoryError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                DirectoryError::Conflict(db.message().to_string())
            }
            other => DirectoryError::DatabaseError(other.to_string()),
        }
    }
}

impl From<HoursParseError> for DirectoryError {
    fn from(e: HoursParseError) -> Self {
        DirectoryError::ValidationError(format!("opening hours: {}", e))
    }
}

impl From<validator::ValidationErrors> for DirectoryError {
    fn from(e: validator::ValidationErrors) -> Self {
        DirectoryError::ValidationError(e.to_string())
    }
}

/// Convert DirectoryError to HTTP response
/// DOCUMENTATION: Maps error types to HTTP status codes and JSON responses
impl ResponseError for DirectoryError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_code) = self.code();

        let body = json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.code().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DirectoryError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DirectoryError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(DirectoryError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(DirectoryError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err: DirectoryError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DirectoryError::NotFound(_)));
    }

    #[test]
    fn test_hours_error_is_validation() {
        let err: DirectoryError = HoursParseError::UnknownDay("funday".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("funday"));
    }
}
