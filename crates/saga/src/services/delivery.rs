//! Delivery service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{BasketBundle, BasketItem, UserId};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::services::request_log::RequestLog;

/// Request to start delivering the basket of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub items: Vec<BasketItem>,
    pub bundles: Vec<BasketBundle>,
}

/// Business answer of the delivery service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Initiated {
        delivery_reference: String,
        estimated_delivery_date: Option<DateTime<Utc>>,
    },
    Rejected {
        error: String,
    },
}

/// Request to cancel an initiated delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelDeliveryRequest {
    pub delivery_reference: String,
    pub reason: String,
}

/// Carrier-side state of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryState {
    Delivered,
    Unknown,
}

/// Answer of a delivery status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub status: DeliveryState,
    pub delivered: bool,
}

impl DeliveryStatus {
    pub const UNKNOWN: DeliveryStatus = DeliveryStatus {
        status: DeliveryState::Unknown,
        delivered: false,
    };
}

/// Trait for delivery operations.
#[async_trait]
pub trait DeliveryService: Send + Sync {
    /// Initiates delivery of an order's basket.
    async fn initiate_delivery(
        &self,
        request: DeliveryRequest,
    ) -> Result<DeliveryResult, ServiceError>;

    /// Cancels an initiated delivery. A refused cancellation is `ServiceError::Rejected`.
    async fn cancel_delivery(&self, request: CancelDeliveryRequest) -> Result<(), ServiceError>;

    /// Reports the carrier-side status of a delivery.
    async fn check_delivery_status(
        &self,
        delivery_reference: &str,
    ) -> Result<DeliveryStatus, ServiceError>;
}

/// Days added to the initiation time for the estimated delivery date.
const ESTIMATED_DELIVERY_DAYS: i64 = 3;

#[derive(Debug, Default)]
struct InMemoryDeliveryState {
    statuses: HashMap<String, DeliveryStatus>,
    requests: RequestLog<DeliveryRequest>,
    cancellations: RequestLog<CancelDeliveryRequest>,
    next_id: u32,
    reject_reason: Option<String>,
    fail_on_initiate: bool,
    fail_on_cancel: bool,
    latency: Option<Duration>,
}

/// In-memory delivery service for testing.
///
/// Delivery statuses live in a map owned by the instance, so separate
/// instances never see each other's deliveries. Deliveries are reported as
/// delivered as soon as they are initiated.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeliveryService {
    state: Arc<Mutex<InMemoryDeliveryState>>,
}

impl InMemoryDeliveryService {
    /// Creates a new in-memory delivery service.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryDeliveryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rejects every delivery with `reason` until cleared with `None`.
    pub fn set_reject_reason(&self, reason: Option<&str>) {
        self.state().reject_reason = reason.map(str::to_string);
    }

    /// Makes initiate calls fail as if the service were unreachable.
    pub fn set_fail_on_initiate(&self, fail: bool) {
        self.state().fail_on_initiate = fail;
    }

    /// Makes cancel calls answer with a refusal.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state().fail_on_cancel = fail;
    }

    /// Delays every answer by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// Returns the number of active (not cancelled) deliveries.
    pub fn delivery_count(&self) -> usize {
        self.state().statuses.len()
    }

    /// Returns the most recent initiate requests, including rejected ones.
    pub fn requests(&self) -> Vec<DeliveryRequest> {
        self.state().requests.entries()
    }

    /// Returns the most recent cancel requests.
    pub fn cancellations(&self) -> Vec<CancelDeliveryRequest> {
        self.state().cancellations.entries()
    }

    async fn simulate_latency(&self) {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DeliveryService for InMemoryDeliveryService {
    async fn initiate_delivery(
        &self,
        request: DeliveryRequest,
    ) -> Result<DeliveryResult, ServiceError> {
        self.simulate_latency().await;

        let mut state = self.state();
        state.requests.record(request.clone());

        if state.fail_on_initiate {
            return Err(ServiceError::Unavailable(
                "delivery service unreachable".to_string(),
            ));
        }
        if let Some(error) = state.reject_reason.clone() {
            tracing::warn!(order_id = %request.order_id, %error, "delivery rejected");
            return Ok(DeliveryResult::Rejected { error });
        }

        state.next_id += 1;
        let delivery_reference = format!("DEL-{}", state.next_id);
        state.statuses.insert(
            delivery_reference.clone(),
            DeliveryStatus {
                status: DeliveryState::Delivered,
                delivered: true,
            },
        );
        tracing::info!(
            order_id = %request.order_id,
            items = request.items.len(),
            bundles = request.bundles.len(),
            %delivery_reference,
            "delivery initiated"
        );

        Ok(DeliveryResult::Initiated {
            delivery_reference,
            estimated_delivery_date: Some(
                Utc::now() + chrono::Duration::days(ESTIMATED_DELIVERY_DAYS),
            ),
        })
    }

    async fn cancel_delivery(&self, request: CancelDeliveryRequest) -> Result<(), ServiceError> {
        self.simulate_latency().await;

        let mut state = self.state();
        state.cancellations.record(request.clone());

        if state.fail_on_cancel {
            return Err(ServiceError::Rejected(format!(
                "cancellation of {} refused",
                request.delivery_reference
            )));
        }

        state.statuses.remove(&request.delivery_reference);
        tracing::info!(
            delivery_reference = %request.delivery_reference,
            reason = %request.reason,
            "delivery cancelled"
        );
        Ok(())
    }

    async fn check_delivery_status(
        &self,
        delivery_reference: &str,
    ) -> Result<DeliveryStatus, ServiceError> {
        self.simulate_latency().await;

        Ok(self
            .state()
            .statuses
            .get(delivery_reference)
            .copied()
            .unwrap_or(DeliveryStatus::UNKNOWN))
    }
}
