//! Order queries and saga trigger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{OrderId, QuoteId};
use domain::{OrderRepository, OrderStatus, OrderView, QuoteRepository, UserId};
use saga::{DeliveryStatus, SagaOutcome, SagaReport};
use serde::Deserialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

/// 404 when the order does not exist, 200 with the report otherwise.
fn saga_response(outcome: SagaOutcome) -> (StatusCode, Json<SagaReport>) {
    let status = if outcome.is_order_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (status, Json(SagaReport::from(outcome)))
}

/// POST /orders/from-quote/:quote_id: create the order and run the full saga.
#[tracing::instrument(skip(state))]
pub async fn create_from_quote<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(quote_id): Path<String>,
) -> Result<(StatusCode, Json<SagaReport>), ApiError> {
    let quote_id: QuoteId = parse_id(&quote_id)?;
    let order = state
        .order_service
        .create_order_from_quote(quote_id)
        .await?;

    let outcome = state.saga_coordinator.execute_order_saga(order.id()).await?;
    Ok((StatusCode::CREATED, Json(SagaReport::from(outcome))))
}

/// POST /orders/:order_id/execute-saga: run or resume the full saga.
#[tracing::instrument(skip(state))]
pub async fn execute_saga<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(order_id): Path<String>,
) -> Result<(StatusCode, Json<SagaReport>), ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let outcome = state.saga_coordinator.execute_order_saga(order_id).await?;
    Ok(saga_response(outcome))
}

/// POST /orders/:order_id/payment: run the payment step only.
#[tracing::instrument(skip(state))]
pub async fn payment<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(order_id): Path<String>,
) -> Result<(StatusCode, Json<SagaReport>), ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let outcome = state.saga_coordinator.execute_payment_step(order_id).await?;
    Ok(saga_response(outcome))
}

/// POST /orders/:order_id/delivery: run the delivery step only.
#[tracing::instrument(skip(state))]
pub async fn delivery<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(order_id): Path<String>,
) -> Result<(StatusCode, Json<SagaReport>), ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let outcome = state.saga_coordinator.execute_delivery_step(order_id).await?;
    Ok(saga_response(outcome))
}

/// GET /orders/:order_id
#[tracing::instrument(skip(state))]
pub async fn get<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let order = state.order_service.get_order(order_id).await?;
    Ok(Json(order.to_view()))
}

/// GET /orders/user/:user_id
#[tracing::instrument(skip(state))]
pub async fn list_for_user<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let orders = state
        .order_service
        .orders_for_user(&UserId::new(user_id))
        .await?;
    Ok(Json(orders.iter().map(|o| o.to_view()).collect()))
}

/// GET /orders?status=FAILED: list orders in a given status.
#[tracing::instrument(skip(state, query))]
pub async fn list_by_status<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let status: OrderStatus = query
        .status
        .ok_or_else(|| ApiError::BadRequest("Query parameter `status` is required".to_string()))?
        .parse()
        .map_err(|e: domain::UnknownOrderStatus| ApiError::BadRequest(e.to_string()))?;

    let orders = state.order_service.orders_by_status(status).await?;
    Ok(Json(orders.iter().map(|o| o.to_view()).collect()))
}

/// GET /orders/:order_id/delivery-status
#[tracing::instrument(skip(state))]
pub async fn delivery_status<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(order_id): Path<String>,
) -> Result<Json<DeliveryStatus>, ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let status = state
        .saga_coordinator
        .delivery_status(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No delivery for order {order_id}")))?;
    Ok(Json(status))
}
