//! External service traits and in-memory implementations for saga steps.

pub mod delivery;
pub mod payment;
mod request_log;

pub use delivery::{
    CancelDeliveryRequest, DeliveryRequest, DeliveryResult, DeliveryService, DeliveryState,
    DeliveryStatus, InMemoryDeliveryService,
};
pub use payment::{
    InMemoryPaymentService, PaymentRequest, PaymentResult, PaymentService, RefundRequest,
};
pub use request_log::REQUEST_LOG_CAPACITY;
