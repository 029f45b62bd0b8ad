//! Order entity, status state machine and related types.

mod aggregate;
mod service;
mod state;
mod view;

pub use aggregate::Order;
pub use service::OrderService;
pub use state::{OrderStatus, UnknownOrderStatus};
pub use view::OrderView;

use thiserror::Error;

/// Which external reference an operation was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Payment,
    Delivery,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Payment => write!(f, "payment"),
            ReferenceKind::Delivery => write!(f, "delivery"),
        }
    }
}

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The transition table does not allow moving from `from` to `to`.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// An external service returned an empty reference.
    #[error("Empty {kind} reference")]
    EmptyReference { kind: ReferenceKind },

    /// A persisted record breaks the reference invariants.
    #[error("Corrupt order record: {0}")]
    CorruptRecord(String),
}
