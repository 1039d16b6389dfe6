use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::service::OrderError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Not implemented: {0}")]
    Unimplemented(String),

    /// Internal failure the caller may safely retry.
    #[error("Conflict: {0}")]
    Retryable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unimplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Retryable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ResourceExhausted(_) => "RESOURCE_EXHAUSTED",
            AppError::Unimplemented(_) => "UNIMPLEMENTED",
            AppError::Retryable(_) | AppError::Internal(_) => "INTERNAL",
        }
    }

    fn log(&self) {
        match self {
            AppError::InvalidArgument(msg)
            | AppError::NotFound(msg)
            | AppError::ResourceExhausted(msg)
            | AppError::Unimplemented(msg) => {
                warn!(code = self.code(), message = %msg, "Request failed");
            }
            AppError::Retryable(msg) | AppError::Internal(msg) => {
                error!(error = ?self, message = %msg, "Internal error");
            }
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
            OrderError::NotFound(msg) => AppError::NotFound(msg),
            OrderError::ResourceExhausted(msg) => AppError::ResourceExhausted(msg),
            err @ OrderError::Contention(_) => AppError::Retryable(err.to_string()),
            err @ (OrderError::Internal(_) | OrderError::Store(_)) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let (public_message, details) = match &self {
            AppError::InvalidArgument(msg)
            | AppError::NotFound(msg)
            | AppError::ResourceExhausted(msg)
            | AppError::Unimplemented(msg) => (msg.clone(), None),
            AppError::Retryable(_) => (
                "Order could not be completed due to concurrent demand".to_string(),
                Some(json!({ "retryable": true })),
            ),
            AppError::Internal(_) => ("An internal error occurred".to_string(), None),
        };

        error_response(code, public_message, details, status)
    }
}
