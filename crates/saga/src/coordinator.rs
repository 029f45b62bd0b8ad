//! Saga coordinator for the order fulfillment saga.

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use common::OrderId;
use domain::{Order, OrderError, OrderRepository, OrderStatus, Quote, QuoteRepository};

use crate::config::SagaConfig;
use crate::error::{SagaError, ServiceError};
use crate::order_fulfillment::{
    self, COMPENSATE_CANCEL_DELIVERY, COMPENSATE_REFUND_PAYMENT, REASON_DELIVERY_FAILED,
    REASON_DELIVERY_INITIATION_FAILED, REASON_QUOTE_NOT_FOUND, REASON_SAGA_EXECUTION_FAILED,
    STEP_CHECK_DELIVERY_STATUS, STEP_INITIATE_DELIVERY, STEP_MARK_DELIVERED,
    STEP_PROCESS_PAYMENT,
};
use crate::outcome::SagaOutcome;
use crate::services::delivery::{
    CancelDeliveryRequest, DeliveryRequest, DeliveryResult, DeliveryService, DeliveryStatus,
};
use crate::services::payment::{PaymentRequest, PaymentResult, PaymentService, RefundRequest};

/// Where a run of the saga ended when no fault occurred.
enum Progress {
    Delivered,
    /// A port gave a negative answer; the order is persisted as `FAILED`.
    Failed(String),
}

/// Orchestrates payment and delivery for one order at a time.
///
/// The coordinator is stateless between calls: everything it needs to
/// resume lives in the persisted order. Every transition is saved before the
/// next port call is made, and every port call is bounded by
/// [`SagaConfig::port_timeout`].
///
/// Calls for the same order are single-flight within this coordinator; a
/// concurrent second call gets [`SagaError::AlreadyRunning`]. Nothing guards
/// against another process driving the same order.
pub struct OrderSagaCoordinator<O, Q, P, D>
where
    O: OrderRepository,
    Q: QuoteRepository,
    P: PaymentService,
    D: DeliveryService,
{
    orders: O,
    quotes: Q,
    payment: P,
    delivery: D,
    config: SagaConfig,
    in_flight: Mutex<HashSet<OrderId>>,
}

/// Removes the order from the in-flight set when the entry point returns.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<OrderId>>,
    order_id: OrderId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.order_id);
    }
}

impl<O, Q, P, D> OrderSagaCoordinator<O, Q, P, D>
where
    O: OrderRepository,
    Q: QuoteRepository,
    P: PaymentService,
    D: DeliveryService,
{
    /// Creates a new coordinator with the default configuration.
    pub fn new(orders: O, quotes: Q, payment: P, delivery: D) -> Self {
        Self::with_config(orders, quotes, payment, delivery, SagaConfig::default())
    }

    pub fn with_config(orders: O, quotes: Q, payment: P, delivery: D, config: SagaConfig) -> Self {
        Self {
            orders,
            quotes,
            payment,
            delivery,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    pub fn quotes(&self) -> &Q {
        &self.quotes
    }

    pub fn payment(&self) -> &P {
        &self.payment
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    pub fn config(&self) -> &SagaConfig {
        &self.config
    }

    /// Runs the full saga for an order: payment, delivery, completion.
    ///
    /// Resumes from the persisted status: an `INITIALIZED` order starts with
    /// payment, `PAYMENT_INITIATED` continues with delivery and
    /// `DELIVERY_INITIATED` is marked delivered. A terminal order is
    /// reported as it is without any port call or write.
    ///
    /// Negative port answers and unexpected faults end in
    /// [`SagaOutcome::Failed`] with the order persisted as `FAILED`. An
    /// [`SagaError`] is returned only when that cannot be achieved or when
    /// the transition table rejects a step.
    #[tracing::instrument(skip(self), fields(saga_type = order_fulfillment::SAGA_TYPE))]
    pub async fn execute_order_saga(&self, order_id: OrderId) -> Result<SagaOutcome, SagaError> {
        let _guard = self.begin(order_id)?;
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = Instant::now();

        let Some(mut order) = self.orders.find_by_id(order_id).await? else {
            tracing::warn!("order not found");
            return Ok(SagaOutcome::OrderNotFound(order_id));
        };

        if order.is_completed() {
            tracing::info!("order already delivered");
            return Ok(SagaOutcome::succeeded(&order));
        }
        if let Some(reason) = order.failure_reason() {
            tracing::info!(%reason, "order already failed");
            return Ok(SagaOutcome::failed(&order, reason));
        }

        let Some(quote) = self.quotes.find_by_id(order.quote_id()).await? else {
            tracing::warn!(quote_id = %order.quote_id(), "quote not found, failing order");
            self.compensate_all(&order, REASON_QUOTE_NOT_FOUND).await;
            self.fail_order(&mut order, REASON_QUOTE_NOT_FOUND).await?;
            self.record_finished(saga_start, false);
            return Ok(SagaOutcome::failed(&order, REASON_QUOTE_NOT_FOUND));
        };

        let outcome = match self.advance(&mut order, &quote).await {
            Ok(Progress::Delivered) => SagaOutcome::succeeded(&order),
            Ok(Progress::Failed(reason)) => SagaOutcome::failed(&order, reason),
            Err(err) if err.is_invalid_transition() => {
                tracing::error!(error = %err, "order rejected a saga step");
                return Err(err);
            }
            Err(fault) => self.recover_from_fault(&mut order, fault).await?,
        };

        self.record_finished(saga_start, outcome.is_success());
        Ok(outcome)
    }

    /// Runs only the payment step.
    ///
    /// The order must be able to move to `PAYMENT_INITIATED`; anything else
    /// is an [`SagaError::InvalidTransition`] and no charge is attempted.
    #[tracing::instrument(skip(self))]
    pub async fn execute_payment_step(&self, order_id: OrderId) -> Result<SagaOutcome, SagaError> {
        let _guard = self.begin(order_id)?;

        let Some(mut order) = self.orders.find_by_id(order_id).await? else {
            return Ok(SagaOutcome::OrderNotFound(order_id));
        };
        ensure_transition(&order, OrderStatus::PaymentInitiated)?;

        let Some(quote) = self.quotes.find_by_id(order.quote_id()).await? else {
            return Ok(SagaOutcome::failed(&order, REASON_QUOTE_NOT_FOUND));
        };

        let error = match self.process_payment(&order, &quote).await {
            Ok(PaymentResult::Captured { payment_reference }) => {
                return self
                    .record_step(&mut order, |order| order.initiate_payment(payment_reference))
                    .await;
            }
            Ok(PaymentResult::Declined { error }) => error,
            Err(err) => err.to_string(),
        };

        tracing::warn!(%error, "payment step failed");
        self.fail_order(&mut order, order_fulfillment::payment_failed(&error))
            .await?;
        Ok(SagaOutcome::failed(&order, error))
    }

    /// Runs only the delivery step, refunding the payment if it fails.
    ///
    /// The order must be able to move to `DELIVERY_INITIATED`. On success the
    /// order stays there; a later full saga run marks it delivered.
    #[tracing::instrument(skip(self))]
    pub async fn execute_delivery_step(&self, order_id: OrderId) -> Result<SagaOutcome, SagaError> {
        let _guard = self.begin(order_id)?;

        let Some(mut order) = self.orders.find_by_id(order_id).await? else {
            return Ok(SagaOutcome::OrderNotFound(order_id));
        };
        ensure_transition(&order, OrderStatus::DeliveryInitiated)?;

        let Some(quote) = self.quotes.find_by_id(order.quote_id()).await? else {
            return Ok(SagaOutcome::failed(&order, REASON_QUOTE_NOT_FOUND));
        };

        let error = match self.initiate_delivery(&order, &quote).await {
            Ok(DeliveryResult::Initiated {
                delivery_reference, ..
            }) => {
                return self
                    .record_step(&mut order, |order| order.initiate_delivery(delivery_reference))
                    .await;
            }
            Ok(DeliveryResult::Rejected { error }) => error,
            Err(err) => err.to_string(),
        };

        tracing::warn!(%error, "delivery step failed, refunding payment");
        self.compensate_payment(&order, REASON_DELIVERY_FAILED).await;
        self.fail_order(&mut order, order_fulfillment::delivery_failed(&error))
            .await?;
        Ok(SagaOutcome::failed(&order, error))
    }

    /// Asks the delivery service about the order's delivery.
    ///
    /// Returns `None` when the order does not exist or has no delivery
    /// reference yet.
    #[tracing::instrument(skip(self))]
    pub async fn delivery_status(
        &self,
        order_id: OrderId,
    ) -> Result<Option<DeliveryStatus>, SagaError> {
        let Some(order) = self.orders.find_by_id(order_id).await? else {
            return Ok(None);
        };
        let Some(delivery_reference) = order.delivery_reference() else {
            return Ok(None);
        };
        let status = self
            .call_port(
                STEP_CHECK_DELIVERY_STATUS,
                self.delivery.check_delivery_status(delivery_reference),
            )
            .await?;
        Ok(Some(status))
    }

    fn begin(&self, order_id: OrderId) -> Result<InFlightGuard<'_>, SagaError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(order_id) {
            tracing::warn!(%order_id, "saga already running for order");
            return Err(SagaError::AlreadyRunning(order_id));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            order_id,
        })
    }

    /// Drives a non-terminal order forward from its current status.
    async fn advance(&self, order: &mut Order, quote: &Quote) -> Result<Progress, SagaError> {
        if order.status() == OrderStatus::Initialized {
            match self.process_payment(order, quote).await? {
                PaymentResult::Captured { payment_reference } => {
                    order.initiate_payment(payment_reference)?;
                    self.orders.save(order).await?;
                    tracing::info!(step = STEP_PROCESS_PAYMENT, "saga step completed");
                }
                PaymentResult::Declined { error } => {
                    tracing::warn!(step = STEP_PROCESS_PAYMENT, %error, "payment declined");
                    let reason = order_fulfillment::payment_failed(&error);
                    self.fail_order(order, reason.clone()).await?;
                    return Ok(Progress::Failed(reason));
                }
            }
        }

        if order.status() == OrderStatus::PaymentInitiated {
            match self.initiate_delivery(order, quote).await? {
                DeliveryResult::Initiated {
                    delivery_reference, ..
                } => {
                    order.initiate_delivery(delivery_reference)?;
                    self.orders.save(order).await?;
                    tracing::info!(step = STEP_INITIATE_DELIVERY, "saga step completed");
                }
                DeliveryResult::Rejected { error } => {
                    tracing::warn!(step = STEP_INITIATE_DELIVERY, %error, "delivery rejected");
                    self.compensate_payment(order, REASON_DELIVERY_INITIATION_FAILED).await;
                    let reason = order_fulfillment::delivery_failed(&error);
                    self.fail_order(order, reason.clone()).await?;
                    return Ok(Progress::Failed(reason));
                }
            }
        }

        if order.status() == OrderStatus::DeliveryInitiated {
            order.mark_delivered()?;
            self.orders.save(order).await?;
            tracing::info!(step = STEP_MARK_DELIVERED, "saga step completed");
        }

        Ok(Progress::Delivered)
    }

    /// Applies a successful port answer to the order and persists it.
    ///
    /// The port call has already taken effect: a fault here compensates it and
    /// fails the order.
    async fn record_step(
        &self,
        order: &mut Order,
        apply: impl FnOnce(&mut Order) -> Result<(), OrderError>,
    ) -> Result<SagaOutcome, SagaError> {
        let recorded = match apply(order) {
            Ok(()) => self.orders.save(order).await.map_err(SagaError::from),
            Err(err) => Err(SagaError::from(err)),
        };
        match recorded {
            Ok(()) => Ok(SagaOutcome::succeeded(order)),
            Err(err) if err.is_invalid_transition() => Err(err),
            Err(fault) => self.recover_from_fault(order, fault).await,
        }
    }

    /// Compensates everything the order holds a reference for, then fails it.
    ///
    /// An order that already reached a terminal status in memory is left
    /// alone; the fault is returned and the persisted order is resumable.
    async fn recover_from_fault(
        &self,
        order: &mut Order,
        fault: SagaError,
    ) -> Result<SagaOutcome, SagaError> {
        if order.is_terminal() {
            tracing::error!(
                error = %fault,
                status = %order.status(),
                "fault while persisting terminal status"
            );
            return Err(fault);
        }

        tracing::error!(error = %fault, status = %order.status(), "saga fault, compensating");
        self.compensate_all(order, REASON_SAGA_EXECUTION_FAILED).await;

        let reason = fault.to_string();
        self.fail_order(order, reason.clone()).await?;
        Ok(SagaOutcome::failed(order, reason))
    }

    async fn fail_order(
        &self,
        order: &mut Order,
        reason: impl Into<String>,
    ) -> Result<(), SagaError> {
        order.mark_failed(reason)?;
        self.orders.save(order).await?;
        Ok(())
    }

    async fn process_payment(
        &self,
        order: &Order,
        quote: &Quote,
    ) -> Result<PaymentResult, ServiceError> {
        let request = PaymentRequest {
            order_id: order.id(),
            user_id: order.user_id().clone(),
            amount: quote.total_price(),
            currency: quote.currency_code().clone(),
        };
        tracing::info!(
            step = STEP_PROCESS_PAYMENT,
            amount = %request.amount,
            currency = %request.currency,
            "saga step started"
        );
        self.call_port(STEP_PROCESS_PAYMENT, self.payment.process_payment(request))
            .await
    }

    async fn initiate_delivery(
        &self,
        order: &Order,
        quote: &Quote,
    ) -> Result<DeliveryResult, ServiceError> {
        let basket = quote.basket_snapshot();
        let request = DeliveryRequest {
            order_id: order.id(),
            user_id: order.user_id().clone(),
            items: basket.items.clone(),
            bundles: basket.bundles.clone(),
        };
        tracing::info!(
            step = STEP_INITIATE_DELIVERY,
            lines = basket.line_count(),
            "saga step started"
        );
        self.call_port(STEP_INITIATE_DELIVERY, self.delivery.initiate_delivery(request))
            .await
    }

    async fn compensate_all(&self, order: &Order, reason: &str) {
        self.compensate_payment(order, reason).await;
        self.compensate_delivery(order, reason).await;
    }

    /// Refunds the captured payment, if any. Failures are logged and swallowed.
    async fn compensate_payment(&self, order: &Order, reason: &str) {
        let Some(payment_reference) = order.payment_reference() else {
            return;
        };
        metrics::counter!("saga_compensations_total", "action" => COMPENSATE_REFUND_PAYMENT)
            .increment(1);

        // The refund amount comes from the quote, not from the order
        let quote = match self.quotes.find_by_id(order.quote_id()).await {
            Ok(Some(quote)) => quote,
            Ok(None) => {
                compensation_failed(
                    COMPENSATE_REFUND_PAYMENT,
                    order,
                    payment_reference,
                    REASON_QUOTE_NOT_FOUND,
                );
                return;
            }
            Err(err) => {
                compensation_failed(COMPENSATE_REFUND_PAYMENT, order, payment_reference, err);
                return;
            }
        };

        let request = RefundRequest {
            payment_reference: payment_reference.to_string(),
            amount: quote.total_price(),
            reason: reason.to_string(),
        };
        match self
            .call_port(COMPENSATE_REFUND_PAYMENT, self.payment.refund_payment(request))
            .await
        {
            Ok(()) => tracing::info!(
                order_id = %order.id(),
                %payment_reference,
                %reason,
                "payment compensated"
            ),
            Err(err) => {
                compensation_failed(COMPENSATE_REFUND_PAYMENT, order, payment_reference, err)
            }
        }
    }

    /// Cancels the initiated delivery, if any. Failures are logged and swallowed.
    async fn compensate_delivery(&self, order: &Order, reason: &str) {
        let Some(delivery_reference) = order.delivery_reference() else {
            return;
        };
        metrics::counter!("saga_compensations_total", "action" => COMPENSATE_CANCEL_DELIVERY)
            .increment(1);

        let request = CancelDeliveryRequest {
            delivery_reference: delivery_reference.to_string(),
            reason: reason.to_string(),
        };
        match self
            .call_port(COMPENSATE_CANCEL_DELIVERY, self.delivery.cancel_delivery(request))
            .await
        {
            Ok(()) => tracing::info!(
                order_id = %order.id(),
                %delivery_reference,
                %reason,
                "delivery compensated"
            ),
            Err(err) => {
                compensation_failed(COMPENSATE_CANCEL_DELIVERY, order, delivery_reference, err)
            }
        }
    }

    async fn call_port<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, ServiceError> {
        let after = self.config.port_timeout;
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| ServiceError::Timeout { operation, after })?
    }

    fn record_finished(&self, saga_start: Instant, success: bool) {
        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        if success {
            metrics::counter!("saga_completed").increment(1);
            tracing::info!(duration, "saga completed successfully");
        } else {
            metrics::counter!("saga_failed").increment(1);
            tracing::info!(duration, "saga finished with failure");
        }
    }
}

fn ensure_transition(order: &Order, target: OrderStatus) -> Result<(), SagaError> {
    if order.can_transition_to(target) {
        Ok(())
    } else {
        Err(SagaError::InvalidTransition {
            from: order.status(),
            to: target,
        })
    }
}

fn compensation_failed(action: &'static str, order: &Order, reference: &str, error: impl Display) {
    metrics::counter!("saga_compensation_failures_total", "action" => action).increment(1);
    tracing::error!(
        order_id = %order.id(),
        action,
        reference,
        error = %error,
        "compensation failed, manual reconciliation required"
    );
}
