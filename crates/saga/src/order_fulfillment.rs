//! Order fulfillment saga constants.

/// The saga type identifier for order fulfillment.
pub const SAGA_TYPE: &str = "OrderFulfillment";

/// Step name: capture payment for the quote total.
pub const STEP_PROCESS_PAYMENT: &str = "process_payment";

/// Step name: hand the basket to the delivery service.
pub const STEP_INITIATE_DELIVERY: &str = "initiate_delivery";

/// Step name: record the order as delivered.
pub const STEP_MARK_DELIVERED: &str = "mark_delivered";

/// Port operation: query the carrier status of a delivery.
pub const STEP_CHECK_DELIVERY_STATUS: &str = "check_delivery_status";

/// Compensation action: refund a captured payment.
pub const COMPENSATE_REFUND_PAYMENT: &str = "refund_payment";

/// Compensation action: cancel an initiated delivery.
pub const COMPENSATE_CANCEL_DELIVERY: &str = "cancel_delivery";

/// Failure reason when the order's quote no longer exists.
pub const REASON_QUOTE_NOT_FOUND: &str = "Quote not found";

/// Compensation reason when the delivery service rejects the order.
pub const REASON_DELIVERY_INITIATION_FAILED: &str = "Delivery initiation failed";

/// Compensation reason when the delivery step variant fails.
pub const REASON_DELIVERY_FAILED: &str = "Delivery failed";

/// Compensation reason after an unexpected fault.
pub const REASON_SAGA_EXECUTION_FAILED: &str = "Saga execution failed";

/// Builds the failure reason for a declined payment.
pub fn payment_failed(error: &str) -> String {
    format!("Payment failed: {error}")
}

/// Builds the failure reason for a rejected delivery.
pub fn delivery_failed(error: &str) -> String {
    format!("Delivery failed: {error}")
}
