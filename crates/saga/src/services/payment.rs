//! Payment service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;
use domain::{CurrencyCode, Money, UserId};

use crate::error::ServiceError;
use crate::services::request_log::RequestLog;

/// Request to capture payment for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount: Money,
    pub currency: CurrencyCode,
}

/// Business answer of the payment service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResult {
    /// Payment captured; the reference identifies it for refunds.
    Captured { payment_reference: String },
    /// Payment refused (card declined, limit exceeded, ...).
    Declined { error: String },
}

/// Request to refund a previously captured payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub payment_reference: String,
    pub amount: Money,
    pub reason: String,
}

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Captures payment for an order.
    async fn process_payment(&self, request: PaymentRequest)
    -> Result<PaymentResult, ServiceError>;

    /// Refunds a captured payment. A refused refund is `ServiceError::Rejected`.
    async fn refund_payment(&self, request: RefundRequest) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<String, PaymentRequest>,
    charges: RequestLog<PaymentRequest>,
    refunds: RequestLog<RefundRequest>,
    next_id: u32,
    decline_reason: Option<String>,
    fail_on_charge: bool,
    fail_on_refund: bool,
    latency: Option<Duration>,
}

/// In-memory payment service for testing.
///
/// References are sequential per instance: `PAY-1`, `PAY-2`, ...
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<Mutex<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryPaymentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declines every charge with `reason` until cleared with `None`.
    pub fn set_decline_reason(&self, reason: Option<&str>) {
        self.state().decline_reason = reason.map(str::to_string);
    }

    /// Makes charge calls fail as if the service were unreachable.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state().fail_on_charge = fail;
    }

    /// Makes refund calls answer with a refusal.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state().fail_on_refund = fail;
    }

    /// Delays every answer by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    /// Returns the number of captured payments that were not refunded.
    pub fn payment_count(&self) -> usize {
        self.state().payments.len()
    }

    /// Returns true if a captured, unrefunded payment has the given reference.
    pub fn has_payment(&self, payment_reference: &str) -> bool {
        self.state().payments.contains_key(payment_reference)
    }

    /// Returns the most recent charge requests, including declined ones.
    pub fn charges(&self) -> Vec<PaymentRequest> {
        self.state().charges.entries()
    }

    /// Returns the most recent refund requests.
    pub fn refunds(&self) -> Vec<RefundRequest> {
        self.state().refunds.entries()
    }

    async fn simulate_latency(&self) {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn process_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentResult, ServiceError> {
        self.simulate_latency().await;

        let mut state = self.state();
        state.charges.record(request.clone());

        if state.fail_on_charge {
            return Err(ServiceError::Unavailable(
                "payment gateway unreachable".to_string(),
            ));
        }
        if let Some(error) = state.decline_reason.clone() {
            tracing::warn!(order_id = %request.order_id, %error, "payment declined");
            return Ok(PaymentResult::Declined { error });
        }

        state.next_id += 1;
        let payment_reference = format!("PAY-{}", state.next_id);
        tracing::info!(
            order_id = %request.order_id,
            amount = %request.amount,
            currency = %request.currency,
            %payment_reference,
            "payment captured"
        );
        state.payments.insert(payment_reference.clone(), request);

        Ok(PaymentResult::Captured { payment_reference })
    }

    async fn refund_payment(&self, request: RefundRequest) -> Result<(), ServiceError> {
        self.simulate_latency().await;

        let mut state = self.state();
        state.refunds.record(request.clone());

        if state.fail_on_refund {
            return Err(ServiceError::Rejected(format!(
                "refund of {} refused",
                request.payment_reference
            )));
        }

        state.payments.remove(&request.payment_reference);
        tracing::info!(
            payment_reference = %request.payment_reference,
            amount = %request.amount,
            reason = %request.reason,
            "payment refunded"
        );
        Ok(())
    }
}
