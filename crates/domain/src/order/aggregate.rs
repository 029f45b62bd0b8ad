//! Order entity implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, QuoteId};

use crate::value_objects::{BusinessPartnerId, UserId};

use super::{OrderError, OrderStatus, ReferenceKind};

/// Order entity.
///
/// Tracks one order from creation out of a quote to delivery or failure.
/// All mutation goes through the transition methods, which consult the
/// [`OrderStatus`] transition table and reject anything it does not list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub(super) id: OrderId,
    pub(super) user_id: UserId,
    pub(super) quote_id: QuoteId,
    pub(super) business_partner_id: Option<BusinessPartnerId>,
    pub(super) status: OrderStatus,
    /// Reference returned by the payment service once payment is captured.
    pub(super) payment_reference: Option<String>,
    /// Reference returned by the delivery service once delivery is initiated.
    pub(super) delivery_reference: Option<String>,
    pub(super) failure_reason: Option<String>,
    pub(super) created_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order for a quote in the `Initialized` state.
    pub fn create_from_quote(
        quote_id: QuoteId,
        user_id: UserId,
        business_partner_id: Option<BusinessPartnerId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_id,
            quote_id,
            business_partner_id,
            status: OrderStatus::Initialized,
            payment_reference: None,
            delivery_reference: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// Query methods
impl Order {
    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the owning user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the quote this order was created from.
    pub fn quote_id(&self) -> QuoteId {
        self.quote_id
    }

    /// Returns the business partner, if any.
    pub fn business_partner_id(&self) -> Option<&BusinessPartnerId> {
        self.business_partner_id.as_ref()
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the payment reference, if payment was captured.
    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    /// Returns the delivery reference, if delivery was initiated.
    pub fn delivery_reference(&self) -> Option<&str> {
        self.delivery_reference.as_deref()
    }

    /// Returns the failure reason, set only when the order failed.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the transition table allows moving to `target`.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.status.can_transition_to(target)
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true if the order was delivered.
    pub fn is_completed(&self) -> bool {
        self.status == OrderStatus::Delivered
    }

    /// Returns true if the order failed.
    pub fn is_failed(&self) -> bool {
        self.status == OrderStatus::Failed
    }
}

// Transition methods
impl Order {
    /// Records a captured payment and moves to `PaymentInitiated`.
    pub fn initiate_payment(
        &mut self,
        payment_reference: impl Into<String>,
    ) -> Result<(), OrderError> {
        self.ensure_transition(OrderStatus::PaymentInitiated)?;
        let payment_reference = non_empty(payment_reference.into(), ReferenceKind::Payment)?;
        self.transition_to(OrderStatus::PaymentInitiated)?;
        self.payment_reference = Some(payment_reference);
        Ok(())
    }

    /// Records an initiated delivery and moves to `DeliveryInitiated`.
    pub fn initiate_delivery(
        &mut self,
        delivery_reference: impl Into<String>,
    ) -> Result<(), OrderError> {
        self.ensure_transition(OrderStatus::DeliveryInitiated)?;
        let delivery_reference = non_empty(delivery_reference.into(), ReferenceKind::Delivery)?;
        self.transition_to(OrderStatus::DeliveryInitiated)?;
        self.delivery_reference = Some(delivery_reference);
        Ok(())
    }

    /// Moves to `Delivered`.
    pub fn mark_delivered(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Delivered)
    }

    /// Moves to `Failed` from any non-terminal state and records the reason.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn ensure_transition(&self, target: OrderStatus) -> Result<(), OrderError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            })
        }
    }

    fn transition_to(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        self.ensure_transition(target)?;
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn non_empty(reference: String, kind: ReferenceKind) -> Result<String, OrderError> {
    if reference.trim().is_empty() {
        Err(OrderError::EmptyReference { kind })
    } else {
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order() -> Order {
        Order::create_from_quote(QuoteId::new(), UserId::new("user-1"), None)
    }

    fn order_in(status: OrderStatus) -> Order {
        let mut order = new_order();
        match status {
            OrderStatus::Initialized => {}
            OrderStatus::PaymentInitiated => {
                order.initiate_payment("PAY-1").unwrap();
            }
            OrderStatus::DeliveryInitiated => {
                order.initiate_payment("PAY-1").unwrap();
                order.initiate_delivery("DEL-1").unwrap();
            }
            OrderStatus::Delivered => {
                order.initiate_payment("PAY-1").unwrap();
                order.initiate_delivery("DEL-1").unwrap();
                order.mark_delivered().unwrap();
            }
            OrderStatus::Failed => {
                order.mark_failed("boom").unwrap();
            }
        }
        order
    }

    fn attempt(order: &mut Order, target: OrderStatus) -> Result<(), OrderError> {
        match target {
            OrderStatus::Initialized => Err(OrderError::InvalidTransition {
                from: order.status(),
                to: target,
            }),
            OrderStatus::PaymentInitiated => order.initiate_payment("PAY-X"),
            OrderStatus::DeliveryInitiated => order.initiate_delivery("DEL-X"),
            OrderStatus::Delivered => order.mark_delivered(),
            OrderStatus::Failed => order.mark_failed("reason"),
        }
    }

    #[test]
    fn test_create_from_quote() {
        let quote_id = QuoteId::new();
        let order = Order::create_from_quote(
            quote_id,
            UserId::new("user-1"),
            Some(BusinessPartnerId::new("bp-9")),
        );

        assert_eq!(order.status(), OrderStatus::Initialized);
        assert_eq!(order.quote_id(), quote_id);
        assert_eq!(order.user_id().as_str(), "user-1");
        assert_eq!(order.business_partner_id().map(|b| b.as_str()), Some("bp-9"));
        assert!(order.payment_reference().is_none());
        assert!(order.delivery_reference().is_none());
        assert!(order.failure_reason().is_none());
        assert_eq!(order.created_at(), order.updated_at());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut order = new_order();

        order.initiate_payment("PAY-1").unwrap();
        assert_eq!(order.status(), OrderStatus::PaymentInitiated);
        assert_eq!(order.payment_reference(), Some("PAY-1"));

        order.initiate_delivery("DEL-1").unwrap();
        assert_eq!(order.status(), OrderStatus::DeliveryInitiated);
        assert_eq!(order.delivery_reference(), Some("DEL-1"));

        order.mark_delivered().unwrap();
        assert!(order.is_completed());
        assert!(order.is_terminal());
        assert!(!order.is_failed());
    }

    #[test]
    fn test_rejected_transitions_leave_order_untouched() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                if from.can_transition_to(to) {
                    continue;
                }
                let mut order = order_in(from);
                let before = order.clone();

                let result = attempt(&mut order, to);

                assert!(
                    matches!(result, Err(OrderError::InvalidTransition { .. })),
                    "{from} -> {to} should be rejected"
                );
                assert_eq!(order, before, "{from} -> {to} mutated the order");
            }
        }
    }

    #[test]
    fn test_allowed_transitions_succeed() {
        for from in OrderStatus::ALL {
            for &to in from.allowed_transitions() {
                let mut order = order_in(from);
                attempt(&mut order, to).unwrap();
                assert_eq!(order.status(), to);
            }
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [OrderStatus::Delivered, OrderStatus::Failed] {
            let mut order = order_in(status);
            assert!(order.initiate_payment("PAY-2").is_err());
            assert!(order.initiate_delivery("DEL-2").is_err());
            assert!(order.mark_delivered().is_err());
            assert!(order.mark_failed("again").is_err());
            assert_eq!(order.status(), status);
        }
    }

    #[test]
    fn test_double_payment_is_rejected() {
        let mut order = order_in(OrderStatus::PaymentInitiated);
        let err = order.initiate_payment("PAY-2").unwrap_err();

        assert_eq!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::PaymentInitiated,
                to: OrderStatus::PaymentInitiated,
            }
        );
        assert_eq!(order.payment_reference(), Some("PAY-1"));
    }

    #[test]
    fn test_delivery_before_payment_is_rejected() {
        let mut order = new_order();
        assert!(order.initiate_delivery("DEL-1").is_err());
        assert!(order.delivery_reference().is_none());
    }

    #[test]
    fn test_mark_failed_records_reason_and_keeps_references() {
        let mut order = order_in(OrderStatus::DeliveryInitiated);
        order.mark_failed("Saga execution failed").unwrap();

        assert!(order.is_failed());
        assert_eq!(order.failure_reason(), Some("Saga execution failed"));
        assert_eq!(order.payment_reference(), Some("PAY-1"));
        assert_eq!(order.delivery_reference(), Some("DEL-1"));
    }

    #[test]
    fn test_empty_reference_is_rejected() {
        let mut order = new_order();
        let err = order.initiate_payment("  ").unwrap_err();

        assert_eq!(
            err,
            OrderError::EmptyReference {
                kind: ReferenceKind::Payment
            }
        );
        assert_eq!(order.status(), OrderStatus::Initialized);
    }

    #[test]
    fn test_empty_reference_on_terminal_order_is_invalid_transition() {
        let mut order = order_in(OrderStatus::Failed);

        assert_eq!(
            order.initiate_payment("").unwrap_err(),
            OrderError::InvalidTransition {
                from: OrderStatus::Failed,
                to: OrderStatus::PaymentInitiated,
            }
        );
        assert_eq!(
            order.initiate_delivery(" ").unwrap_err(),
            OrderError::InvalidTransition {
                from: OrderStatus::Failed,
                to: OrderStatus::DeliveryInitiated,
            }
        );
    }

    #[test]
    fn test_transition_touches_updated_at() {
        let mut order = new_order();
        let created = order.updated_at();
        order.initiate_payment("PAY-1").unwrap();
        assert!(order.updated_at() >= created);
        assert_eq!(order.created_at(), created);
    }
}
