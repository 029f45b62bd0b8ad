//! Domain error types.

use common::{OrderId, QuoteId};
use thiserror::Error;

use crate::order::OrderError;
use crate::quote::QuoteError;
use crate::repository::RepositoryError;

/// Errors that can occur during domain use cases.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The order entity rejected the operation.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// The quote could not be built.
    #[error("Quote error: {0}")]
    Quote(#[from] QuoteError),

    /// An error occurred in the repository.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Quote not found: {0}")]
    QuoteNotFound(QuoteId),

    /// The quote is already fulfilled by another order.
    #[error("Order {order_id} already exists for quote {quote_id}")]
    OrderAlreadyExists { quote_id: QuoteId, order_id: OrderId },
}
