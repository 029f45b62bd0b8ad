use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, QuoteId};
use domain::{
    Order, OrderRepository, OrderStatus, Quote, QuoteRepository, RepositoryError,
    RepositoryResult, UserId,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    quotes: HashMap<QuoteId, Quote>,
}

/// In-memory order and quote storage for tests and the default server.
///
/// Every instance owns its own maps; clones share them. The repositories
/// handed out by [`orders`](Self::orders) and [`quotes`](Self::quotes) see
/// the same state, so quote deletion can check for referencing orders.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> InMemoryOrderRepository {
        InMemoryOrderRepository {
            state: Arc::clone(&self.state),
        }
    }

    pub fn quotes(&self) -> InMemoryQuoteRepository {
        InMemoryQuoteRepository {
            state: Arc::clone(&self.state),
        }
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of stored quotes.
    pub async fn quote_count(&self) -> usize {
        self.state.read().await.quotes.len()
    }

    /// Clears all orders and quotes.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.quotes.clear();
    }
}

/// Order repository view of an [`InMemoryStore`].
#[derive(Clone)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryOrderRepository {
    async fn collect_where(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| predicate(o))
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.created_at(), o.id()));
        orders
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn find_by_quote_id(&self, quote_id: QuoteId) -> RepositoryResult<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .find(|o| o.quote_id() == quote_id)
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> RepositoryResult<Vec<Order>> {
        Ok(self.collect_where(|o| o.user_id() == user_id).await)
    }

    async fn find_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        Ok(self.collect_where(|o| o.status() == status).await)
    }

    async fn save(&self, order: &Order) -> RepositoryResult<()> {
        let mut state = self.state.write().await;

        // One order per quote (unique constraint simulation)
        let quote_taken = state
            .orders
            .values()
            .any(|o| o.quote_id() == order.quote_id() && o.id() != order.id());
        if quote_taken {
            return Err(RepositoryError::Duplicate {
                entity: "order for quote",
                key: order.quote_id().to_string(),
            });
        }

        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn delete(&self, order_id: OrderId) -> RepositoryResult<bool> {
        Ok(self.state.write().await.orders.remove(&order_id).is_some())
    }
}

/// Quote repository view of an [`InMemoryStore`].
#[derive(Clone)]
pub struct InMemoryQuoteRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_by_id(&self, quote_id: QuoteId) -> RepositoryResult<Option<Quote>> {
        Ok(self.state.read().await.quotes.get(&quote_id).cloned())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> RepositoryResult<Vec<Quote>> {
        let state = self.state.read().await;
        let mut quotes: Vec<_> = state
            .quotes
            .values()
            .filter(|q| q.user_id() == user_id)
            .cloned()
            .collect();
        quotes.sort_by_key(|q| (q.created_at(), q.quote_id()));
        Ok(quotes)
    }

    async fn save(&self, quote: &Quote) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        if state.quotes.contains_key(&quote.quote_id()) {
            return Err(RepositoryError::Duplicate {
                entity: "quote",
                key: quote.quote_id().to_string(),
            });
        }
        state.quotes.insert(quote.quote_id(), quote.clone());
        Ok(())
    }

    async fn delete(&self, quote_id: QuoteId) -> RepositoryResult<bool> {
        let mut state = self.state.write().await;
        if state.orders.values().any(|o| o.quote_id() == quote_id) {
            return Err(RepositoryError::StillReferenced(quote_id));
        }
        Ok(state.quotes.remove(&quote_id).is_some())
    }
}
