//! HTTP API server with observability for the order fulfillment saga.
//!
//! Provides REST endpoints for quotes, orders and saga execution,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use domain::{OrderRepository, OrderService, QuoteRepository, QuoteService};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemoryDeliveryService, InMemoryPaymentService, OrderSagaCoordinator, SagaConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<O, Q>(state: Arc<AppState<O, Q>>, metrics_handle: PrometheusHandle) -> Router
where
    O: OrderRepository + 'static,
    Q: QuoteRepository + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/quotes", post(routes::quotes::create::<O, Q>))
        .route("/quotes/{quote_id}", get(routes::quotes::get::<O, Q>))
        .route("/quotes/{quote_id}", delete(routes::quotes::delete::<O, Q>))
        .route(
            "/quotes/user/{user_id}",
            get(routes::quotes::list_for_user::<O, Q>),
        )
        .route("/orders", get(routes::orders::list_by_status::<O, Q>))
        .route(
            "/orders/from-quote/{quote_id}",
            post(routes::orders::create_from_quote::<O, Q>),
        )
        .route("/orders/{order_id}", get(routes::orders::get::<O, Q>))
        .route(
            "/orders/user/{user_id}",
            get(routes::orders::list_for_user::<O, Q>),
        )
        .route(
            "/orders/{order_id}/execute-saga",
            post(routes::orders::execute_saga::<O, Q>),
        )
        .route(
            "/orders/{order_id}/payment",
            post(routes::orders::payment::<O, Q>),
        )
        .route(
            "/orders/{order_id}/delivery",
            post(routes::orders::delivery::<O, Q>),
        )
        .route(
            "/orders/{order_id}/delivery-status",
            get(routes::orders::delivery_status::<O, Q>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given repositories with mock
/// payment and delivery services.
pub fn create_default_state<O, Q>(
    orders: O,
    quotes: Q,
    saga_config: SagaConfig,
) -> Arc<AppState<O, Q>>
where
    O: OrderRepository + Clone,
    Q: QuoteRepository + Clone,
{
    let saga_coordinator = OrderSagaCoordinator::with_config(
        orders.clone(),
        quotes.clone(),
        InMemoryPaymentService::new(),
        InMemoryDeliveryService::new(),
        saga_config,
    );

    Arc::new(AppState {
        order_service: OrderService::new(orders, quotes.clone()),
        quote_service: QuoteService::new(quotes),
        saga_coordinator,
    })
}
