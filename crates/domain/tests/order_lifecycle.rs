//! Integration tests for the quote and order use cases.
//!
//! These run the services against the in-memory store and walk orders
//! through the status table the way the saga does.

use chrono::Utc;
use common::{OrderId, QuoteId};
use domain::{
    BasketItem, BasketSnapshot, CurrencyCode, DomainError, ItemId, Money, Order, OrderError,
    OrderRepository, OrderService, OrderStatus, PricedItem, PricingSnapshot, QuoteError,
    QuoteService, RepositoryError, UserId,
};
use store::{InMemoryOrderRepository, InMemoryQuoteRepository, InMemoryStore};

struct Services {
    quotes: QuoteService<InMemoryQuoteRepository>,
    orders: OrderService<InMemoryOrderRepository, InMemoryQuoteRepository>,
}

fn create_services() -> Services {
    let store = InMemoryStore::new();
    Services {
        quotes: QuoteService::new(store.quotes()),
        orders: OrderService::new(store.orders(), store.quotes()),
    }
}

fn basket(quantity: u32) -> BasketSnapshot {
    BasketSnapshot {
        items: vec![BasketItem {
            item_id: ItemId::new("SKU-001"),
            quantity,
        }],
        bundles: vec![],
        snapshot_at: Utc::now(),
    }
}

fn pricing(quantity: u32, unit_cents: i64) -> PricingSnapshot {
    let unit_price = Money::from_cents(unit_cents);
    let total = unit_price.multiply(quantity);
    PricingSnapshot {
        items: vec![PricedItem {
            item_id: ItemId::new("SKU-001"),
            quantity,
            unit_price,
            discount: Money::zero(),
            total_price: total,
        }],
        bundles: vec![],
        subtotal: total,
        total_discount: Money::zero(),
        total,
        currency: CurrencyCode::parse("usd").unwrap(),
        checks_performed: vec![],
        priced_at: Utc::now(),
    }
}

async fn create_quote(services: &Services, user: &str) -> QuoteId {
    services
        .quotes
        .create_quote(UserId::new(user), None, basket(3), pricing(3, 4500))
        .await
        .unwrap()
        .quote_id()
}

mod quotes {
    use super::*;

    #[tokio::test]
    async fn create_and_read_quote() {
        let services = create_services();
        let quote_id = create_quote(&services, "user-1").await;

        let quote = services.quotes.get_quote(quote_id).await.unwrap();
        assert_eq!(quote.total_price(), Money::from_cents(13_500));
        assert_eq!(quote.total_price().to_string(), "135.00");
        assert_eq!(quote.currency_code().as_str(), "USD");

        let mine = services
            .quotes
            .quotes_for_user(&UserId::new("user-1"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn invalid_quote_is_not_stored() {
        let services = create_services();

        let result = services
            .quotes
            .create_quote(UserId::new("user-1"), None, basket(0), pricing(1, 100))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Quote(QuoteError::InvalidQuantity { .. }))
        ));
        assert!(
            services
                .quotes
                .quotes_for_user(&UserId::new("user-1"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn missing_quote_is_not_found() {
        let services = create_services();
        let result = services.quotes.get_quote(QuoteId::new()).await;
        assert!(matches!(result, Err(DomainError::QuoteNotFound(_))));

        let result = services.quotes.delete_quote(QuoteId::new()).await;
        assert!(matches!(result, Err(DomainError::QuoteNotFound(_))));
    }

    #[tokio::test]
    async fn quote_with_order_cannot_be_deleted() {
        let services = create_services();
        let quote_id = create_quote(&services, "user-1").await;
        services
            .orders
            .create_order_from_quote(quote_id)
            .await
            .unwrap();

        let result = services.quotes.delete_quote(quote_id).await;
        assert!(matches!(
            result,
            Err(DomainError::Repository(RepositoryError::StillReferenced(_)))
        ));
    }

    #[tokio::test]
    async fn unreferenced_quote_can_be_deleted() {
        let services = create_services();
        let quote_id = create_quote(&services, "user-1").await;

        services.quotes.delete_quote(quote_id).await.unwrap();

        assert!(services.quotes.get_quote(quote_id).await.is_err());
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn create_order_from_quote() {
        let services = create_services();
        let quote_id = create_quote(&services, "user-1").await;

        let order = services
            .orders
            .create_order_from_quote(quote_id)
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Initialized);
        assert_eq!(order.quote_id(), quote_id);
        assert_eq!(order.user_id().as_str(), "user-1");
        assert!(order.payment_reference().is_none());

        let loaded = services.orders.get_order(order.id()).await.unwrap();
        assert_eq!(loaded, order);

        let by_quote = services
            .orders
            .get_order_by_quote(quote_id)
            .await
            .unwrap();
        assert_eq!(by_quote.map(|o| o.id()), Some(order.id()));
    }

    #[tokio::test]
    async fn order_requires_existing_quote() {
        let services = create_services();
        let result = services
            .orders
            .create_order_from_quote(QuoteId::new())
            .await;
        assert!(matches!(result, Err(DomainError::QuoteNotFound(_))));
    }

    #[tokio::test]
    async fn one_order_per_quote() {
        let services = create_services();
        let quote_id = create_quote(&services, "user-1").await;
        let first = services
            .orders
            .create_order_from_quote(quote_id)
            .await
            .unwrap();

        let result = services.orders.create_order_from_quote(quote_id).await;

        match result {
            Err(DomainError::OrderAlreadyExists { order_id, .. }) => {
                assert_eq!(order_id, first.id())
            }
            other => panic!("expected OrderAlreadyExists, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let services = create_services();
        let result = services.orders.get_order(OrderId::new()).await;
        assert!(matches!(result, Err(DomainError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn full_lifecycle_is_persisted_step_by_step() {
        let services = create_services();
        let quote_id = create_quote(&services, "user-1").await;
        let mut order = services
            .orders
            .create_order_from_quote(quote_id)
            .await
            .unwrap();
        let repo = services.orders.orders();

        order.initiate_payment("PAY-1").unwrap();
        repo.save(&order).await.unwrap();
        order.initiate_delivery("DEL-1").unwrap();
        repo.save(&order).await.unwrap();
        order.mark_delivered().unwrap();
        repo.save(&order).await.unwrap();

        let loaded = services.orders.get_order(order.id()).await.unwrap();
        assert!(loaded.is_completed());
        assert!(loaded.is_terminal());
        assert_eq!(loaded.payment_reference(), Some("PAY-1"));
        assert_eq!(loaded.delivery_reference(), Some("DEL-1"));

        let delivered = services
            .orders
            .orders_by_status(OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(delivered.len(), 1);
    }

    #[tokio::test]
    async fn terminal_order_rejects_further_transitions() {
        let services = create_services();
        let quote_id = create_quote(&services, "user-1").await;
        let mut order = services
            .orders
            .create_order_from_quote(quote_id)
            .await
            .unwrap();

        order.mark_failed("Quote not found").unwrap();

        let attempts: Vec<Result<(), OrderError>> = vec![
            order.clone().initiate_payment("PAY-1"),
            order.clone().initiate_delivery("DEL-1"),
            order.clone().mark_delivered(),
            order.clone().mark_failed("again"),
        ];
        for attempt in attempts {
            assert!(matches!(attempt, Err(OrderError::InvalidTransition { .. })));
        }
        assert_eq!(order.failure_reason(), Some("Quote not found"));
    }

    #[tokio::test]
    async fn orders_for_user_only_returns_their_orders() {
        let services = create_services();
        for user in ["user-1", "user-1", "user-2"] {
            let quote_id = create_quote(&services, user).await;
            services
                .orders
                .create_order_from_quote(quote_id)
                .await
                .unwrap();
        }

        let mine = services
            .orders
            .orders_for_user(&UserId::new("user-1"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|o| o.user_id().as_str() == "user-1"));

        let none: Vec<Order> = services
            .orders
            .orders_for_user(&UserId::new("nobody"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
