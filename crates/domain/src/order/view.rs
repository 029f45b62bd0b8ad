//! Read projection of the order entity.

use chrono::{DateTime, Utc};
use common::{OrderId, QuoteId};
use serde::{Deserialize, Serialize};

use crate::value_objects::{BusinessPartnerId, UserId};

use super::{Order, OrderError, OrderStatus};

/// Flat, serializable view of an [`Order`] with every field.
///
/// This is what callers of the saga receive and what storage backends
/// persist. Converting back with `Order::try_from` re-checks the reference
/// invariants, so a corrupt row never becomes a live entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub quote_id: QuoteId,
    pub business_partner_id: Option<BusinessPartnerId>,
    pub status: OrderStatus,
    pub payment_reference: Option<String>,
    pub delivery_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            user_id: order.user_id.clone(),
            quote_id: order.quote_id,
            business_partner_id: order.business_partner_id.clone(),
            status: order.status,
            payment_reference: order.payment_reference.clone(),
            delivery_reference: order.delivery_reference.clone(),
            failure_reason: order.failure_reason.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            user_id: order.user_id,
            quote_id: order.quote_id,
            business_partner_id: order.business_partner_id,
            status: order.status,
            payment_reference: order.payment_reference,
            delivery_reference: order.delivery_reference,
            failure_reason: order.failure_reason,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl TryFrom<OrderView> for Order {
    type Error = OrderError;

    fn try_from(view: OrderView) -> Result<Self, Self::Error> {
        let (order_id, status) = (view.order_id, view.status);
        let corrupt = move |what: &str| -> Result<Order, OrderError> {
            Err(OrderError::CorruptRecord(format!(
                "order {order_id} in status {status}: {what}"
            )))
        };

        let has_payment = view.payment_reference.is_some();
        let has_delivery = view.delivery_reference.is_some();
        let has_failure = view.failure_reason.is_some();

        if view.status.requires_payment_reference() && !has_payment {
            return corrupt("missing payment reference");
        }
        if view.status.requires_delivery_reference() && !has_delivery {
            return corrupt("missing delivery reference");
        }
        if view.status == OrderStatus::Initialized && (has_payment || has_delivery) {
            return corrupt("references present before payment");
        }
        if view.status == OrderStatus::PaymentInitiated && has_delivery {
            return corrupt("delivery reference present before delivery");
        }
        if has_delivery && !has_payment {
            return corrupt("delivery reference without payment reference");
        }
        if has_failure != (view.status == OrderStatus::Failed) {
            return corrupt("failure reason does not match status");
        }

        Ok(Order {
            id: view.order_id,
            user_id: view.user_id,
            quote_id: view.quote_id,
            business_partner_id: view.business_partner_id,
            status: view.status,
            payment_reference: view.payment_reference,
            delivery_reference: view.delivery_reference,
            failure_reason: view.failure_reason,
            created_at: view.created_at,
            updated_at: view.updated_at,
        })
    }
}

impl Order {
    /// Returns the read projection of this order.
    pub fn to_view(&self) -> OrderView {
        OrderView::from(self)
    }
}
