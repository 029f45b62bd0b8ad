//! Quote entity.

use chrono::{DateTime, Utc};
use common::QuoteId;
use serde::Serialize;

use crate::value_objects::{BundleId, BusinessPartnerId, CurrencyCode, ItemId, Money, UserId};

use super::{BasketSnapshot, PricingSnapshot, QuoteError};

/// Immutable priced snapshot of a basket at checkout time.
///
/// There are no mutating methods: a quote is built once by [`Quote::create`]
/// (or rebuilt from storage by [`Quote::restore`]) and only read afterwards.
/// `total_price` and `currency_code` are taken from the pricing snapshot, so
/// they always agree with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    quote_id: QuoteId,
    user_id: UserId,
    business_partner_id: Option<BusinessPartnerId>,
    total_price: Money,
    currency_code: CurrencyCode,
    basket_snapshot: BasketSnapshot,
    pricing_snapshot: PricingSnapshot,
    created_at: DateTime<Utc>,
}

impl Quote {
    /// Creates a new quote with a fresh identifier.
    pub fn create(
        user_id: UserId,
        business_partner_id: Option<BusinessPartnerId>,
        basket_snapshot: BasketSnapshot,
        pricing_snapshot: PricingSnapshot,
    ) -> Result<Self, QuoteError> {
        Self::restore(
            QuoteId::new(),
            user_id,
            business_partner_id,
            basket_snapshot,
            pricing_snapshot,
            Utc::now(),
        )
    }

    /// Rebuilds a quote from persisted parts, re-running validation.
    pub fn restore(
        quote_id: QuoteId,
        user_id: UserId,
        business_partner_id: Option<BusinessPartnerId>,
        basket_snapshot: BasketSnapshot,
        pricing_snapshot: PricingSnapshot,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuoteError> {
        if user_id.is_blank() {
            return Err(QuoteError::BlankUserId);
        }
        validate_basket(&basket_snapshot)?;
        validate_pricing(&pricing_snapshot)?;

        Ok(Self {
            quote_id,
            user_id,
            business_partner_id,
            total_price: pricing_snapshot.total,
            currency_code: pricing_snapshot.currency.clone(),
            basket_snapshot,
            pricing_snapshot,
            created_at,
        })
    }

    pub fn quote_id(&self) -> QuoteId {
        self.quote_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn business_partner_id(&self) -> Option<&BusinessPartnerId> {
        self.business_partner_id.as_ref()
    }

    /// Returns the amount to charge, equal to the pricing snapshot total.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn currency_code(&self) -> &CurrencyCode {
        &self.currency_code
    }

    pub fn basket_snapshot(&self) -> &BasketSnapshot {
        &self.basket_snapshot
    }

    pub fn pricing_snapshot(&self) -> &PricingSnapshot {
        &self.pricing_snapshot
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the item identifiers in the basket snapshot.
    pub fn item_ids(&self) -> Vec<&ItemId> {
        self.basket_snapshot
            .items
            .iter()
            .map(|item| &item.item_id)
            .collect()
    }

    /// Returns the bundle identifiers in the basket snapshot.
    pub fn bundle_ids(&self) -> Vec<&BundleId> {
        self.basket_snapshot
            .bundles
            .iter()
            .map(|bundle| &bundle.bundle_id)
            .collect()
    }
}

fn validate_basket(basket: &BasketSnapshot) -> Result<(), QuoteError> {
    let item_quantities = basket
        .items
        .iter()
        .map(|i| (i.item_id.as_str(), i.quantity));
    let bundle_quantities = basket
        .bundles
        .iter()
        .map(|b| (b.bundle_id.as_str(), b.quantity));

    for (line, quantity) in item_quantities.chain(bundle_quantities) {
        if quantity == 0 {
            return Err(QuoteError::InvalidQuantity {
                line: line.to_string(),
                quantity,
            });
        }
    }
    Ok(())
}

fn validate_pricing(pricing: &PricingSnapshot) -> Result<(), QuoteError> {
    let item_lines = pricing.items.iter().map(|i| {
        (
            i.item_id.as_str(),
            i.quantity,
            [i.unit_price, i.discount, i.total_price],
        )
    });
    let bundle_lines = pricing.bundles.iter().map(|b| {
        (
            b.bundle_id.as_str(),
            b.quantity,
            [b.unit_price, b.discount, b.total_price],
        )
    });

    for (line, quantity, amounts) in item_lines.chain(bundle_lines) {
        if quantity == 0 {
            return Err(QuoteError::InvalidQuantity {
                line: line.to_string(),
                quantity,
            });
        }
        if amounts.iter().any(Money::is_negative) {
            return Err(QuoteError::NegativeAmount {
                field: format!("pricing line {line}"),
            });
        }
    }

    for (field, amount) in [
        ("subtotal", pricing.subtotal),
        ("total_discount", pricing.total_discount),
        ("total", pricing.total),
    ] {
        if amount.is_negative() {
            return Err(QuoteError::NegativeAmount {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}
