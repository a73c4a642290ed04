//! API error types and handling.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rookery::{ExplainabilityError, ModelError, RookeryError, ValidationError};
use serde::Serialize;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found or not available.
    NotFound(String),
    /// Malformed request payload.
    BadRequest(String),
    /// The request's blocking work outlived its budget.
    Timeout(Duration),
    /// Internal server error.
    Internal(String),
    /// Error from the rookery library.
    Rookery(RookeryError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    /// HTTP status and machine-readable error code.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            ApiError::Rookery(e) => match e {
                RookeryError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
                RookeryError::Model(_) => (StatusCode::UNPROCESSABLE_ENTITY, "model_error"),
                RookeryError::Explainability(ExplainabilityError::InvalidThreshold(_)) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invalid_threshold")
                }
                RookeryError::Explainability(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "explainability_error")
                }
                RookeryError::DataLoad(_) => (StatusCode::NOT_FOUND, "not_found"),
                RookeryError::Json(_) => (StatusCode::BAD_REQUEST, "bad_request"),
                RookeryError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<RookeryError> for ApiError {
    fn from(err: RookeryError) -> Self {
        ApiError::Rookery(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Rookery(err.into())
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::Rookery(err.into())
    }
}

impl From<ExplainabilityError> for ApiError {
    fn from(err: ExplainabilityError) -> Self {
        ApiError::Rookery(err.into())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Timeout(budget) => {
                write!(f, "Request exceeded its {} s budget", budget.as_secs())
            }
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Rookery(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApiError {}
