//! Results of the saga entry points.

use common::OrderId;
use domain::{Order, OrderView};
use serde::{Deserialize, Serialize};

/// How a saga entry point ended.
///
/// `OrderNotFound` means nothing was mutated. `Failed` carries the order as
/// persisted, which is `FAILED` with a failure reason unless a step variant
/// stopped before touching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome {
    Succeeded(OrderView),
    Failed { order: OrderView, error: String },
    OrderNotFound(OrderId),
}

impl SagaOutcome {
    pub(crate) fn succeeded(order: &Order) -> Self {
        SagaOutcome::Succeeded(order.to_view())
    }

    pub(crate) fn failed(order: &Order, error: impl Into<String>) -> Self {
        SagaOutcome::Failed {
            order: order.to_view(),
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SagaOutcome::Succeeded(_))
    }

    pub fn is_order_not_found(&self) -> bool {
        matches!(self, SagaOutcome::OrderNotFound(_))
    }

    /// Returns the order view, absent only when the order does not exist.
    pub fn order(&self) -> Option<&OrderView> {
        match self {
            SagaOutcome::Succeeded(order) | SagaOutcome::Failed { order, .. } => Some(order),
            SagaOutcome::OrderNotFound(_) => None,
        }
    }

    pub fn error(&self) -> Option<String> {
        match self {
            SagaOutcome::Succeeded(_) => None,
            SagaOutcome::Failed { error, .. } => Some(error.clone()),
            SagaOutcome::OrderNotFound(order_id) => Some(format!("Order not found: {order_id}")),
        }
    }
}

/// Wire shape of a saga result: `{success, order?, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<SagaOutcome> for SagaReport {
    fn from(outcome: SagaOutcome) -> Self {
        let success = outcome.is_success();
        let error = outcome.error();
        let order = match outcome {
            SagaOutcome::Succeeded(order) | SagaOutcome::Failed { order, .. } => Some(order),
            SagaOutcome::OrderNotFound(_) => None,
        };
        Self {
            success,
            order,
            error,
        }
    }
}
