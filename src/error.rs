//! Error handling module
//!
//! Centralized error types and HTTP response conversion. The ledger's typed
//! failures stay recoverable all the way to the boundary, where each kind is
//! mapped to exactly one status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::LedgerError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    // Ledger errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // Server errors (5xx)
    #[error("internal error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "auth_required"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),

            AppError::Ledger(err) => match err {
                LedgerError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
                LedgerError::InsufficientFunds { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_funds")
                }
                LedgerError::SelfTransfer => (StatusCode::BAD_REQUEST, "self_transfer"),
                LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                LedgerError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            },

            AppError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            AppError::Config(err) => {
                tracing::error!("config error: {err:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
