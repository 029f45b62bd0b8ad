//! Repository implementations for the order fulfillment domain.
//!
//! - [`InMemoryStore`]: per-instance maps, used by tests and the default server
//! - [`PostgresStore`]: `sqlx` backed tables created by the workspace migrations

mod memory;
mod postgres;

pub use memory::{InMemoryOrderRepository, InMemoryQuoteRepository, InMemoryStore};
pub use postgres::{PostgresOrderRepository, PostgresQuoteRepository, PostgresStore};
