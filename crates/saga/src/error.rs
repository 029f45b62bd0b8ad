//! Saga error types.

use std::time::Duration;

use common::OrderId;
use domain::{DomainError, OrderError, OrderStatus, RepositoryError};
use thiserror::Error;

/// Failure of an external port call that is not a business answer.
///
/// A declined payment or a rejected delivery is a normal outcome and is
/// reported through the port's result type instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service could not be reached or answered with an internal error.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A refund or cancellation was refused.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The call did not complete within the configured bound.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Errors that can occur while driving an order saga.
///
/// Business failures (declined payment, rejected delivery, missing quote)
/// are not errors; they end the saga with a failed outcome.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The order's transition table rejected a step.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// External service error.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Another saga call for the same order is still in flight.
    #[error("Saga already running for order {0}")]
    AlreadyRunning(OrderId),
}

impl From<OrderError> for SagaError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { from, to } => SagaError::InvalidTransition { from, to },
            other => SagaError::Domain(DomainError::Order(other)),
        }
    }
}

impl SagaError {
    /// Returns true for an entity rejection, which the saga never absorbs.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, SagaError::InvalidTransition { .. })
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
