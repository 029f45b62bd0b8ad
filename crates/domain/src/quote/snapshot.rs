//! Basket and pricing snapshots captured in a quote.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{BundleId, CurrencyCode, ItemId, Money};

/// A catalog item line of the basket at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketItem {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// A bundle line of the basket at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketBundle {
    pub bundle_id: BundleId,
    pub quantity: u32,
}

/// What the basket contained when it was priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketSnapshot {
    pub items: Vec<BasketItem>,
    pub bundles: Vec<BasketBundle>,
    pub snapshot_at: DateTime<Utc>,
}

impl BasketSnapshot {
    /// Returns the total number of lines (items plus bundles).
    pub fn line_count(&self) -> usize {
        self.items.len() + self.bundles.len()
    }
}

/// Priced line for a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedItem {
    pub item_id: ItemId,
    pub quantity: u32,
    pub unit_price: Money,
    pub discount: Money,
    pub total_price: Money,
}

/// Priced line for a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedBundle {
    pub bundle_id: BundleId,
    pub quantity: u32,
    pub unit_price: Money,
    pub discount: Money,
    pub total_price: Money,
}

/// Result of the pricing policy for a basket snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub items: Vec<PricedItem>,
    pub bundles: Vec<PricedBundle>,
    pub subtotal: Money,
    pub total_discount: Money,
    pub total: Money,
    pub currency: CurrencyCode,
    /// Names of the policy checks that ran while pricing.
    pub checks_performed: Vec<String>,
    pub priced_at: DateTime<Utc>,
}
