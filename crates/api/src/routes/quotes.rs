//! Quote endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::QuoteId;
use domain::{
    BasketSnapshot, BusinessPartnerId, OrderRepository, PricingSnapshot, Quote, QuoteRepository,
    UserId,
};
use serde::Deserialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateQuoteRequest {
    pub user_id: String,
    pub business_partner_id: Option<String>,
    pub basket_snapshot: BasketSnapshot,
    pub pricing_snapshot: PricingSnapshot,
}

/// POST /quotes: store a priced basket snapshot as a quote.
#[tracing::instrument(skip(state, req))]
pub async fn create<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Json(req): Json<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<Quote>), ApiError> {
    let quote = state
        .quote_service
        .create_quote(
            UserId::new(req.user_id),
            req.business_partner_id.map(BusinessPartnerId::new),
            req.basket_snapshot,
            req.pricing_snapshot,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(quote)))
}

/// GET /quotes/:quote_id
#[tracing::instrument(skip(state))]
pub async fn get<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(quote_id): Path<String>,
) -> Result<Json<Quote>, ApiError> {
    let quote_id: QuoteId = parse_id(&quote_id)?;
    Ok(Json(state.quote_service.get_quote(quote_id).await?))
}

/// GET /quotes/user/:user_id
#[tracing::instrument(skip(state))]
pub async fn list_for_user<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Quote>>, ApiError> {
    let quotes = state
        .quote_service
        .quotes_for_user(&UserId::new(user_id))
        .await?;
    Ok(Json(quotes))
}

/// DELETE /quotes/:quote_id: refused while an order references the quote.
#[tracing::instrument(skip(state))]
pub async fn delete<O: OrderRepository + 'static, Q: QuoteRepository + 'static>(
    State(state): State<Arc<AppState<O, Q>>>,
    Path(quote_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let quote_id: QuoteId = parse_id(&quote_id)?;
    state.quote_service.delete_quote(quote_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
