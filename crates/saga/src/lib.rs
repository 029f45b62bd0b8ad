//! Saga orchestration for order fulfillment.
//!
//! The order fulfillment saga drives a persisted order through:
//! 1. Process payment
//! 2. Initiate delivery
//! 3. Mark delivered
//!
//! A negative answer or fault after payment was captured is compensated by
//! refunding the payment and cancelling any initiated delivery. The order
//! itself is the only saga state, so an interrupted run resumes from its
//! persisted status.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod order_fulfillment;
pub mod outcome;
pub mod services;

pub use config::SagaConfig;
pub use coordinator::OrderSagaCoordinator;
pub use error::{SagaError, ServiceError};
pub use outcome::{SagaOutcome, SagaReport};
pub use services::{
    CancelDeliveryRequest, DeliveryRequest, DeliveryResult, DeliveryService, DeliveryState,
    DeliveryStatus, InMemoryDeliveryService, InMemoryPaymentService, PaymentRequest,
    PaymentResult, PaymentService, RefundRequest,
};
