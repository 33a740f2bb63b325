//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use saga::{LimitServiceError, SagaError};
use serde::Serialize;

use crate::auth::AuthError;

/// API-level error type that maps to HTTP responses.
///
/// Internal faults carry only a category message; the detail is logged
/// where the error is converted.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    AlreadyExists(String),
    InvalidArgument(String),
    Unauthenticated(String),
    PermissionDenied(String),
    Unavailable(String),
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::NotFound(m)
            | ApiError::AlreadyExists(m)
            | ApiError::InvalidArgument(m)
            | ApiError::Unauthenticated(m)
            | ApiError::PermissionDenied(m)
            | ApiError::Unavailable(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            code: status.as_u16(),
            message: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

const LIMIT_NOT_ENOUGH: &str = "Limit available not enough";
const CREATE_FAILED: &str = "Error while create transaction";

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound => ApiError::NotFound("Transaction not found".to_string()),
            DomainError::InvalidRequest(message) => ApiError::InvalidArgument(message),
            DomainError::MalformedContractNumber(_) => {
                ApiError::InvalidArgument(err.to_string())
            }
            DomainError::DuplicateContractNumber(_) => {
                ApiError::AlreadyExists("Transaction already exists".to_string())
            }
            DomainError::Store(ref source) => {
                tracing::error!(error = %source, "store fault while serving request");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        match &err {
            SagaError::InvalidRequest(message) => ApiError::InvalidArgument(message.clone()),
            SagaError::InsufficientLimit { .. } => {
                ApiError::InvalidArgument(LIMIT_NOT_ENOUGH.to_string())
            }
            // The remote side refused the decrement, so the limit ran out
            // between check and confirm.
            SagaError::ConfirmationFailed {
                source: LimitServiceError::Rejected(_),
                ..
            } => ApiError::InvalidArgument(LIMIT_NOT_ENOUGH.to_string()),
            SagaError::ConfirmationFailed { .. }
            | SagaError::UpstreamUnavailable(_)
            | SagaError::Cancelled => {
                ApiError::Unavailable("Limit service unavailable".to_string())
            }
            SagaError::LimitNotFound { .. } => {
                ApiError::NotFound("Consumer limit not found".to_string())
            }
            SagaError::DuplicateContractNumber(_) => {
                ApiError::AlreadyExists("Transaction already exists".to_string())
            }
            SagaError::StoreFault(_)
            | SagaError::CompensationFault { .. }
            | SagaError::UnreconciledDecrement { .. } => {
                tracing::error!(error = %err, outcome = %err.outcome(), "transaction creation failed");
                ApiError::Internal(CREATE_FAILED.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden => ApiError::PermissionDenied(err.to_string()),
            AuthError::Signing(_) => {
                tracing::error!(error = %err, "token signing failed");
                ApiError::Internal("Internal server error".to_string())
            }
            AuthError::MissingToken
            | AuthError::MalformedHeader
            | AuthError::Expired
            | AuthError::InvalidToken(_) => ApiError::Unauthenticated(err.to_string()),
        }
    }
}
