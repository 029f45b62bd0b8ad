//! Domain layer for order fulfillment.
//!
//! This crate provides:
//! - Value objects (`Money`, `CurrencyCode`, string identifiers)
//! - The immutable `Quote` entity with its basket and pricing snapshots
//! - The `Order` entity and its `OrderStatus` transition table
//! - Repository contracts implemented by the `store` crate
//! - `OrderService` and `QuoteService` use cases

pub mod error;
pub mod order;
pub mod quote;
pub mod repository;
pub mod value_objects;

pub use error::DomainError;
pub use order::{
    Order, OrderError, OrderService, OrderStatus, OrderView, ReferenceKind, UnknownOrderStatus,
};
pub use quote::{
    BasketBundle, BasketItem, BasketSnapshot, PricedBundle, PricedItem, PricingSnapshot, Quote,
    QuoteError, QuoteService,
};
pub use repository::{OrderRepository, QuoteRepository, RepositoryError, RepositoryResult};
pub use value_objects::{
    BundleId, BusinessPartnerId, CurrencyCode, InvalidCurrencyCode, ItemId, Money, UserId,
};
