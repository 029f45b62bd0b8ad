//! Quote entity: the immutable priced basket an order is fulfilled from.

mod aggregate;
mod service;
mod snapshot;

pub use aggregate::Quote;
pub use service::QuoteService;
pub use snapshot::{
    BasketBundle, BasketItem, BasketSnapshot, PricedBundle, PricedItem, PricingSnapshot,
};

use thiserror::Error;

/// Errors raised while building a quote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// The quote has no owner.
    #[error("User ID is required")]
    BlankUserId,

    /// A basket or pricing line has a quantity below one.
    #[error("Invalid quantity {quantity} for {line} (must be at least 1)")]
    InvalidQuantity { line: String, quantity: u32 },

    /// A priced amount is negative.
    #[error("Negative amount in {field}")]
    NegativeAmount { field: String },
}
