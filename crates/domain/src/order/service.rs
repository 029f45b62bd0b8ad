//! Order use cases on top of the repositories.

use common::{OrderId, QuoteId};

use crate::error::DomainError;
use crate::repository::{OrderRepository, QuoteRepository};
use crate::value_objects::UserId;

use super::{Order, OrderStatus};

/// Service for creating and querying orders.
///
/// Status changes after creation belong to the saga coordinator; this
/// service only creates orders and reads them back.
pub struct OrderService<O: OrderRepository, Q: QuoteRepository> {
    orders: O,
    quotes: Q,
}

impl<O: OrderRepository, Q: QuoteRepository> OrderService<O, Q> {
    pub fn new(orders: O, quotes: Q) -> Self {
        Self { orders, quotes }
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    pub fn quotes(&self) -> &Q {
        &self.quotes
    }

    /// Creates an `INITIALIZED` order for a quote.
    ///
    /// The quote must exist and must not already have an order.
    #[tracing::instrument(skip(self))]
    pub async fn create_order_from_quote(&self, quote_id: QuoteId) -> Result<Order, DomainError> {
        let quote = self
            .quotes
            .find_by_id(quote_id)
            .await?
            .ok_or(DomainError::QuoteNotFound(quote_id))?;

        if let Some(existing) = self.orders.find_by_quote_id(quote_id).await? {
            return Err(DomainError::OrderAlreadyExists {
                quote_id,
                order_id: existing.id(),
            });
        }

        let order = Order::create_from_quote(
            quote_id,
            quote.user_id().clone(),
            quote.business_partner_id().cloned(),
        );
        self.orders.save(&order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id(), "Order created from quote");

        Ok(order)
    }

    /// Loads an order, failing with `OrderNotFound` if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_quote(&self, quote_id: QuoteId) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.find_by_quote_id(quote_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.orders.find_by_user_id(user_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, DomainError> {
        Ok(self.orders.find_by_status(status).await?)
    }
}
