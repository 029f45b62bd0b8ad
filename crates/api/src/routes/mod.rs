//! HTTP route handlers and the state they share.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod quotes;

use std::str::FromStr;

use domain::{OrderRepository, OrderService, QuoteRepository, QuoteService};
use saga::{InMemoryDeliveryService, InMemoryPaymentService, OrderSagaCoordinator};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<O: OrderRepository, Q: QuoteRepository> {
    pub order_service: OrderService<O, Q>,
    pub quote_service: QuoteService<Q>,
    pub saga_coordinator:
        OrderSagaCoordinator<O, Q, InMemoryPaymentService, InMemoryDeliveryService>,
}

/// Parses an identifier from a path segment.
pub(crate) fn parse_id<T: FromStr>(id: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
