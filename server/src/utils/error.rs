use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::models::TimerError;
use crate::store::StoreError;
use crate::utils::response::error as error_response;
use crate::utils::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<TimerError> for AppError {
    fn from(err: TimerError) -> Self {
        AppError::InvalidState(err.to_string())
    }
}

impl AppError {
    pub fn not_found(what: &str, id: &str) -> Self {
        AppError::NotFound(format!("{} '{}' was not found", what, id))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StoreError(StoreError::Missing(_)) => StatusCode::NOT_FOUND,
            AppError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::StoreError(StoreError::Missing(_)) => "NOT_FOUND",
            AppError::StoreError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(fields) => {
                warn!(fields = %fields, "Validation failed");
            }
            AppError::NotFound(msg) | AppError::Forbidden(msg) | AppError::InvalidState(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::StoreError(e) => {
                error!(error = ?e, "Store error");
            }
            AppError::InternalServerError(msg) => {
                error!(message = %msg, "Application error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        let (public_message, details) = match &self {
            AppError::ValidationError(fields) => (
                "The provided input is invalid".to_string(),
                serde_json::to_value(fields).ok(),
            ),
            AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::InvalidState(msg)
            | AppError::InternalServerError(msg) => (msg.clone(), None),
            AppError::StoreError(StoreError::Missing(what)) => {
                (format!("{} was not found", what), None)
            }
            AppError::StoreError(_) => ("A database error occurred".to_string(), None),
        };

        error_response(code, public_message, details, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        let mut fields = FieldErrors::new();
        fields.require("content", "");

        assert_eq!(
            AppError::ValidationError(fields).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::not_found("ticket", "t1").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::InvalidState("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::StoreError(StoreError::Missing("ticket t1".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InternalServerError("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_timer_errors_become_invalid_state() {
        let err = AppError::from(TimerError::InvalidPauseDuration);
        assert_eq!(err.code(), "INVALID_STATE");
        assert!(err.to_string().contains("pause duration is invalid"));
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = AppError::not_found("agent", "a1").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
