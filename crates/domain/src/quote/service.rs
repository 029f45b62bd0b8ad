//! Quote use cases on top of the quote repository.

use common::QuoteId;

use crate::error::DomainError;
use crate::repository::QuoteRepository;
use crate::value_objects::{BusinessPartnerId, UserId};

use super::{BasketSnapshot, PricingSnapshot, Quote};

/// Service for storing and reading priced quotes.
pub struct QuoteService<Q: QuoteRepository> {
    quotes: Q,
}

impl<Q: QuoteRepository> QuoteService<Q> {
    pub fn new(quotes: Q) -> Self {
        Self { quotes }
    }

    pub fn quotes(&self) -> &Q {
        &self.quotes
    }

    /// Validates and persists a new quote.
    #[tracing::instrument(skip(self, basket_snapshot, pricing_snapshot))]
    pub async fn create_quote(
        &self,
        user_id: UserId,
        business_partner_id: Option<BusinessPartnerId>,
        basket_snapshot: BasketSnapshot,
        pricing_snapshot: PricingSnapshot,
    ) -> Result<Quote, DomainError> {
        let quote = Quote::create(
            user_id,
            business_partner_id,
            basket_snapshot,
            pricing_snapshot,
        )?;
        self.quotes.save(&quote).await?;

        tracing::info!(
            quote_id = %quote.quote_id(),
            total = %quote.total_price(),
            currency = %quote.currency_code(),
            "Quote created"
        );

        Ok(quote)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_quote(&self, quote_id: QuoteId) -> Result<Quote, DomainError> {
        self.quotes
            .find_by_id(quote_id)
            .await?
            .ok_or(DomainError::QuoteNotFound(quote_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn quotes_for_user(&self, user_id: &UserId) -> Result<Vec<Quote>, DomainError> {
        Ok(self.quotes.find_by_user_id(user_id).await?)
    }

    /// Deletes a quote that no order references.
    #[tracing::instrument(skip(self))]
    pub async fn delete_quote(&self, quote_id: QuoteId) -> Result<(), DomainError> {
        if self.quotes.delete(quote_id).await? {
            Ok(())
        } else {
            Err(DomainError::QuoteNotFound(quote_id))
        }
    }
}
