use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, QuoteId};
use domain::{
    BasketSnapshot, BusinessPartnerId, CurrencyCode, Order, OrderRepository, OrderStatus,
    OrderView, PricingSnapshot, Quote, QuoteRepository, RepositoryError, RepositoryResult, UserId,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, quote_id, business_partner_id, status, \
     payment_reference, delivery_reference, failure_reason, created_at, updated_at";

const QUOTE_COLUMNS: &str = "id, user_id, business_partner_id, total_price_cents, currency_code, \
     basket_snapshot, pricing_snapshot, created_at";

/// PostgreSQL-backed storage for orders and quotes.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    pub fn orders(&self) -> PostgresOrderRepository {
        PostgresOrderRepository {
            pool: self.pool.clone(),
        }
    }

    pub fn quotes(&self) -> PostgresQuoteRepository {
        PostgresQuoteRepository {
            pool: self.pool.clone(),
        }
    }
}

/// Order repository backed by the `orders` table.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    fn row_to_order(row: PgRow) -> RepositoryResult<Order> {
        let status = get::<String>(&row, "status")?
            .parse::<OrderStatus>()
            .map_err(|e| RepositoryError::CorruptRecord(e.to_string()))?;

        let view = OrderView {
            order_id: OrderId::from_uuid(get::<Uuid>(&row, "id")?),
            user_id: UserId::new(get::<String>(&row, "user_id")?),
            quote_id: QuoteId::from_uuid(get::<Uuid>(&row, "quote_id")?),
            business_partner_id: get::<Option<String>>(&row, "business_partner_id")?
                .map(BusinessPartnerId::new),
            status,
            payment_reference: get(&row, "payment_reference")?,
            delivery_reference: get(&row, "delivery_reference")?,
            failure_reason: get(&row, "failure_reason")?,
            created_at: get(&row, "created_at")?,
            updated_at: get(&row, "updated_at")?,
        };

        Order::try_from(view).map_err(|e| RepositoryError::CorruptRecord(e.to_string()))
    }

    async fn fetch_orders(&self, sql: &str, bind: String) -> RepositoryResult<Vec<Order>> {
        let rows = sqlx::query(sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_by_quote_id(&self, quote_id: QuoteId) -> RepositoryResult<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE quote_id = $1"
        ))
        .bind(quote_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> RepositoryResult<Vec<Order>> {
        self.fetch_orders(
            &format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
            ),
            user_id.as_str().to_string(),
        )
        .await
    }

    async fn find_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        self.fetch_orders(
            &format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE status = $1 ORDER BY created_at ASC, id ASC"
            ),
            status.as_str().to_string(),
        )
        .await
    }

    async fn save(&self, order: &Order) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, quote_id, business_partner_id, status,
                                payment_reference, delivery_reference, failure_reason,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                payment_reference = EXCLUDED.payment_reference,
                delivery_reference = EXCLUDED.delivery_reference,
                failure_reason = EXCLUDED.failure_reason,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_str())
        .bind(order.quote_id().as_uuid())
        .bind(order.business_partner_id().map(|b| b.as_str()))
        .bind(order.status().as_str())
        .bind(order.payment_reference())
        .bind(order.delivery_reference())
        .bind(order.failure_reason())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_order_quote")
            {
                return RepositoryError::Duplicate {
                    entity: "order for quote",
                    key: order.quote_id().to_string(),
                };
            }
            RepositoryError::backend(e)
        })?;

        Ok(())
    }

    async fn delete(&self, order_id: OrderId) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        Ok(result.rows_affected() > 0)
    }
}

/// Quote repository backed by the `quotes` table.
#[derive(Clone)]
pub struct PostgresQuoteRepository {
    pool: PgPool,
}

impl PostgresQuoteRepository {
    fn row_to_quote(row: PgRow) -> RepositoryResult<Quote> {
        let quote_id = QuoteId::from_uuid(get::<Uuid>(&row, "id")?);
        let basket: BasketSnapshot =
            serde_json::from_value(get::<serde_json::Value>(&row, "basket_snapshot")?)?;
        let pricing: PricingSnapshot =
            serde_json::from_value(get::<serde_json::Value>(&row, "pricing_snapshot")?)?;

        let currency = get::<String>(&row, "currency_code")?
            .parse::<CurrencyCode>()
            .map_err(|e| RepositoryError::CorruptRecord(e.to_string()))?;
        let total_cents: i64 = get(&row, "total_price_cents")?;

        // Denormalised columns must agree with the pricing snapshot
        if total_cents != pricing.total.cents() || currency != pricing.currency {
            return Err(RepositoryError::CorruptRecord(format!(
                "quote {quote_id}: total or currency differs from pricing snapshot"
            )));
        }

        let created_at: DateTime<Utc> = get(&row, "created_at")?;
        Quote::restore(
            quote_id,
            UserId::new(get::<String>(&row, "user_id")?),
            get::<Option<String>>(&row, "business_partner_id")?.map(BusinessPartnerId::new),
            basket,
            pricing,
            created_at,
        )
        .map_err(|e| RepositoryError::CorruptRecord(format!("quote {quote_id}: {e}")))
    }
}

#[async_trait]
impl QuoteRepository for PostgresQuoteRepository {
    async fn find_by_id(&self, quote_id: QuoteId) -> RepositoryResult<Option<Quote>> {
        let row = sqlx::query(&format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = $1"))
            .bind(quote_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        row.map(Self::row_to_quote).transpose()
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> RepositoryResult<Vec<Quote>> {
        let rows = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        rows.into_iter().map(Self::row_to_quote).collect()
    }

    async fn save(&self, quote: &Quote) -> RepositoryResult<()> {
        let basket_json = serde_json::to_value(quote.basket_snapshot())?;
        let pricing_json = serde_json::to_value(quote.pricing_snapshot())?;

        sqlx::query(
            r#"
            INSERT INTO quotes (id, user_id, business_partner_id, total_price_cents, currency_code,
                                basket_snapshot, pricing_snapshot, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(quote.quote_id().as_uuid())
        .bind(quote.user_id().as_str())
        .bind(quote.business_partner_id().map(|b| b.as_str()))
        .bind(quote.total_price().cents())
        .bind(quote.currency_code().as_str())
        .bind(basket_json)
        .bind(pricing_json)
        .bind(quote.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Duplicate {
                    entity: "quote",
                    key: quote.quote_id().to_string(),
                };
            }
            RepositoryError::backend(e)
        })?;

        Ok(())
    }

    async fn delete(&self, quote_id: QuoteId) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM quotes WHERE id = $1")
            .bind(quote_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("fk_order_quote")
                {
                    return RepositoryError::StillReferenced(quote_id);
                }
                RepositoryError::backend(e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> RepositoryResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(RepositoryError::backend)
}
