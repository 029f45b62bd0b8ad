//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::SagaConfig;
use serde_json::{Value, json};
use store::{InMemoryOrderRepository, InMemoryQuoteRepository, InMemoryStore};
use tower::ServiceExt;

type TestState = Arc<api::routes::AppState<InMemoryOrderRepository, InMemoryQuoteRepository>>;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup_with_state() -> (axum::Router, TestState) {
    let store = InMemoryStore::new();
    let state = api::create_default_state(store.orders(), store.quotes(), SagaConfig::default());
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

fn setup() -> axum::Router {
    setup_with_state().0
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

fn quote_request(user_id: &str, quantity: u32) -> Value {
    let now = chrono::Utc::now().to_rfc3339();
    let total = 4500 * i64::from(quantity);
    json!({
        "user_id": user_id,
        "business_partner_id": "bp-1",
        "basket_snapshot": {
            "items": [{ "item_id": "SKU-001", "quantity": quantity }],
            "bundles": [],
            "snapshot_at": now,
        },
        "pricing_snapshot": {
            "items": [{
                "item_id": "SKU-001",
                "quantity": quantity,
                "unit_price": { "cents": 4500 },
                "discount": { "cents": 0 },
                "total_price": { "cents": total },
            }],
            "bundles": [],
            "subtotal": { "cents": total },
            "total_discount": { "cents": 0 },
            "total": { "cents": total },
            "currency": "usd",
            "checks_performed": ["stock"],
            "priced_at": now,
        },
    })
}

async fn create_quote(app: &axum::Router, user_id: &str) -> String {
    let (status, json) = send(app, "POST", "/quotes", Some(quote_request(user_id, 3))).await;
    assert_eq!(status, StatusCode::CREATED);
    json["quote_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["saga"], "OrderFulfillment");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_get_quote() {
    let app = setup();
    let quote_id = create_quote(&app, "user-1").await;

    let (status, json) = send(&app, "GET", &format!("/quotes/{quote_id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"], "user-1");
    assert_eq!(json["business_partner_id"], "bp-1");
    assert_eq!(json["total_price"]["cents"], 13_500);
    assert_eq!(json["currency_code"], "USD");

    let (status, json) = send(&app, "GET", "/quotes/user/user-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_quote_is_bad_request() {
    let app = setup();
    let (status, json) = send(&app, "POST", "/quotes", Some(quote_request("user-1", 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid quantity"));
}

#[tokio::test]
async fn test_invalid_id_format() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid ID format"));
}

#[tokio::test]
async fn test_missing_quote_and_order_are_not_found() {
    let app = setup();
    let id = common::QuoteId::new();

    let (status, _) = send(&app, "GET", &format!("/quotes/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", &format!("/orders/from-quote/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_from_quote_runs_saga() {
    let app = setup();
    let quote_id = create_quote(&app, "user-1").await;

    let (status, json) = send(&app, "POST", &format!("/orders/from-quote/{quote_id}"), None).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert!(json.get("error").is_none());
    assert_eq!(json["order"]["status"], "DELIVERED");
    assert_eq!(json["order"]["payment_reference"], "PAY-1");
    assert_eq!(json["order"]["delivery_reference"], "DEL-1");

    let order_id = json["order"]["order_id"].as_str().unwrap();
    let (status, json) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["quote_id"], quote_id.as_str());

    let (status, json) = send(
        &app,
        "GET",
        &format!("/orders/{order_id}/delivery-status"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "DELIVERED");
    assert_eq!(json["delivered"], true);
}

#[tokio::test]
async fn test_second_order_for_quote_conflicts() {
    let app = setup();
    let quote_id = create_quote(&app, "user-1").await;
    send(&app, "POST", &format!("/orders/from-quote/{quote_id}"), None).await;

    let (status, _) = send(&app, "POST", &format!("/orders/from-quote/{quote_id}"), None).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_payment_declined_is_reported() {
    let (app, state) = setup_with_state();
    state
        .saga_coordinator
        .payment()
        .set_decline_reason(Some("card declined"));
    let quote_id = create_quote(&app, "user-1").await;

    let (status, json) = send(&app, "POST", &format!("/orders/from-quote/{quote_id}"), None).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Payment failed: card declined");
    assert_eq!(json["order"]["status"], "FAILED");

    let (status, json) = send(&app, "GET", "/orders?status=failed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_step_endpoints() {
    let (app, state) = setup_with_state();
    let quote_id = create_quote(&app, "user-1").await;
    let order = state
        .order_service
        .create_order_from_quote(quote_id.parse().unwrap())
        .await
        .unwrap();
    let order_id = order.id();

    let (status, _) = send(&app, "POST", &format!("/orders/{order_id}/delivery"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/payment"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["status"], "PAYMENT_INITIATED");

    let (status, _) = send(&app, "POST", &format!("/orders/{order_id}/payment"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/delivery"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["status"], "DELIVERY_INITIATED");

    let (status, json) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/execute-saga"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["status"], "DELIVERED");
    assert_eq!(state.saga_coordinator.payment().charges().len(), 1);
}

#[tokio::test]
async fn test_execute_saga_for_unknown_order() {
    let app = setup();
    let order_id = common::OrderId::new();

    let (status, json) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/execute-saga"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert!(json.get("order").is_none());
    assert_eq!(json["error"], format!("Order not found: {order_id}"));
}

#[tokio::test]
async fn test_orders_for_user() {
    let app = setup();
    for user in ["user-1", "user-1", "user-2"] {
        let quote_id = create_quote(&app, user).await;
        send(&app, "POST", &format!("/orders/from-quote/{quote_id}"), None).await;
    }

    let (status, json) = send(&app, "GET", "/orders/user/user-1", None).await;

    assert_eq!(status, StatusCode::OK);
    let orders = json.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["user_id"] == "user-1"));
}

#[tokio::test]
async fn test_list_orders_requires_valid_status() {
    let app = setup();

    let (status, _) = send(&app, "GET", "/orders", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&app, "GET", "/orders?status=SHIPPED", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("SHIPPED"));
}

#[tokio::test]
async fn test_delete_quote() {
    let app = setup();
    let referenced = create_quote(&app, "user-1").await;
    send(&app, "POST", &format!("/orders/from-quote/{referenced}"), None).await;
    let unreferenced = create_quote(&app, "user-1").await;

    let (status, _) = send(&app, "DELETE", &format!("/quotes/{referenced}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &format!("/quotes/{unreferenced}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/quotes/{unreferenced}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delivery_status_without_delivery() {
    let (app, state) = setup_with_state();
    let quote_id = create_quote(&app, "user-1").await;
    let order = state
        .order_service
        .create_order_from_quote(quote_id.parse().unwrap())
        .await
        .unwrap();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/orders/{}/delivery-status", order.id()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
