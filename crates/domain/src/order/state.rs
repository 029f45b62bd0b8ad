//! Order status state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its fulfillment lifecycle.
///
/// State transitions:
/// ```text
/// Initialized ──► PaymentInitiated ──► DeliveryInitiated ──► Delivered
///      │                 │                     │
///      └─────────────────┴─────────────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order created from a quote, nothing external has happened yet.
    #[default]
    Initialized,

    /// Payment has been captured.
    PaymentInitiated,

    /// Delivery has been initiated with the carrier.
    DeliveryInitiated,

    /// Order has been delivered (terminal state).
    Delivered,

    /// Order failed, possibly after compensation (terminal state).
    Failed,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Initialized,
        OrderStatus::PaymentInitiated,
        OrderStatus::DeliveryInitiated,
        OrderStatus::Delivered,
        OrderStatus::Failed,
    ];

    /// Returns the statuses reachable from this one in a single transition.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Initialized => &[OrderStatus::PaymentInitiated, OrderStatus::Failed],
            OrderStatus::PaymentInitiated => {
                &[OrderStatus::DeliveryInitiated, OrderStatus::Failed]
            }
            OrderStatus::DeliveryInitiated => &[OrderStatus::Delivered, OrderStatus::Failed],
            OrderStatus::Delivered | OrderStatus::Failed => &[],
        }
    }

    /// Returns true if `target` is reachable from this status in one transition.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Returns true if an order in this status must hold a payment reference.
    pub fn requires_payment_reference(&self) -> bool {
        matches!(
            self,
            OrderStatus::PaymentInitiated | OrderStatus::DeliveryInitiated | OrderStatus::Delivered
        )
    }

    /// Returns true if an order in this status must hold a delivery reference.
    pub fn requires_delivery_reference(&self) -> bool {
        matches!(
            self,
            OrderStatus::DeliveryInitiated | OrderStatus::Delivered
        )
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Initialized => "INITIALIZED",
            OrderStatus::PaymentInitiated => "PAYMENT_INITIATED",
            OrderStatus::DeliveryInitiated => "DELIVERY_INITIATED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownOrderStatus(s.to_string()))
    }
}
