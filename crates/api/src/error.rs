//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, RepositoryError};
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Saga execution error.
    Saga(SagaError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => (domain_status(&err), err.to_string()),
            ApiError::Saga(err) => (saga_status(&err), err.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::OrderNotFound(_) | DomainError::QuoteNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Quote(_) => StatusCode::BAD_REQUEST,
        DomainError::Order(order_err) => order_status(order_err),
        DomainError::OrderAlreadyExists { .. } => StatusCode::CONFLICT,
        DomainError::Repository(repo_err) => repository_status(repo_err),
    }
}

fn order_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::InvalidTransition { .. } => StatusCode::CONFLICT,
        OrderError::EmptyReference { .. } => StatusCode::BAD_REQUEST,
        OrderError::CorruptRecord(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Duplicate { .. } | RepositoryError::StillReferenced(_) => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn saga_status(err: &SagaError) -> StatusCode {
    match err {
        SagaError::InvalidTransition { .. } | SagaError::AlreadyRunning(_) => StatusCode::CONFLICT,
        SagaError::Domain(domain_err) => domain_status(domain_err),
        SagaError::Repository(repo_err) => repository_status(repo_err),
        SagaError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}
