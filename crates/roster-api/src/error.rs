use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use roster_db::DbError;

/// Structured error body returned by every endpoint on failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// Missing, malformed or expired token.
    #[error("authentication required")]
    Unauthenticated,

    /// Deliberately identical for unknown users and wrong passwords.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The caller lacks the role or ownership the operation needs.
    #[error("insufficient permissions")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("username is already taken")]
    DuplicateUsername,

    #[error("upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("could not allocate a unique join code, try again")]
    ConflictRetryExhausted,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated => "TOKEN_INVALID",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthorized => "PERMISSION_DENIED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateUsername => "USERNAME_TAKEN",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::ConflictRetryExhausted => "JOIN_CODE_EXHAUSTED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateUsername => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ConflictRetryExhausted => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DuplicateUsername(_) => AppError::DuplicateUsername,
            DbError::NotFound(what) => AppError::NotFound(what.to_string()),
            DbError::ConflictRetryExhausted(_) => AppError::ConflictRetryExhausted,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match self {
            AppError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { code, message })).into_response()
    }
}
