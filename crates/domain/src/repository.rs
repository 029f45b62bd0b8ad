//! Persistence contracts for orders and quotes.
//!
//! The domain owns these traits; the `store` crate provides the in-memory
//! and PostgreSQL implementations.

use std::error::Error as StdError;

use async_trait::async_trait;
use common::{OrderId, QuoteId};
use thiserror::Error;

use crate::order::{Order, OrderStatus};
use crate::quote::Quote;
use crate::value_objects::UserId;

/// Errors that can occur when reading or writing persisted entities.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A record with the same identity or unique key already exists.
    #[error("{entity} already exists: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// The quote cannot be deleted while an order references it.
    #[error("Quote {0} is still referenced by an order")]
    StillReferenced(QuoteId),

    /// A stored record could not be turned back into an entity.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// A snapshot column could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl RepositoryError {
    /// Wraps a backend-specific error.
    pub fn backend(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        RepositoryError::Backend(err.into())
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Read/write access to persisted orders.
///
/// Implementations must be thread-safe. `save` is an upsert keyed by the
/// order id; an order whose quote is already referenced by a different
/// order is rejected with [`RepositoryError::Duplicate`].
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<Order>>;

    async fn find_by_quote_id(&self, quote_id: QuoteId) -> RepositoryResult<Option<Order>>;

    /// Returns the user's orders, oldest first.
    async fn find_by_user_id(&self, user_id: &UserId) -> RepositoryResult<Vec<Order>>;

    /// Returns the orders currently in `status`, oldest first.
    async fn find_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>>;

    async fn save(&self, order: &Order) -> RepositoryResult<()>;

    /// Deletes an order. Returns `false` if it did not exist.
    async fn delete(&self, order_id: OrderId) -> RepositoryResult<bool>;
}

/// Read/write access to persisted quotes.
///
/// Quotes are immutable, so `save` only ever inserts: saving an id that
/// already exists fails with [`RepositoryError::Duplicate`].
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(&self, quote_id: QuoteId) -> RepositoryResult<Option<Quote>>;

    /// Returns the user's quotes, oldest first.
    async fn find_by_user_id(&self, user_id: &UserId) -> RepositoryResult<Vec<Quote>>;

    async fn save(&self, quote: &Quote) -> RepositoryResult<()>;

    /// Deletes a quote. Returns `false` if it did not exist and
    /// [`RepositoryError::StillReferenced`] if an order points at it.
    async fn delete(&self, quote_id: QuoteId) -> RepositoryResult<bool>;
}
