use crate::database::error::{DatabaseError, DatabaseErrorKind, DbResult};
use crate::database::repository::OrderRepository;
use crate::payments::types::{Order, OrderStatus};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

/// Row of the `orders` table
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub code: String,
    pub secret: String,
    pub organizer: String,
    pub event: String,
    pub total: Decimal,
    pub currency: String,
    pub status: String,
    pub testmode: bool,
    pub comment: String,
}

impl TryFrom<OrderRow> for Order {
    type Error = DatabaseError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::SerializationError {
                message: format!("unknown order status '{}'", row.status),
            })
        })?;

        Ok(Order {
            code: row.code,
            secret: row.secret,
            organizer: row.organizer,
            event: row.event,
            total: row.total,
            currency: row.currency,
            status,
            testmode: row.testmode,
            comment: row.comment,
        })
    }
}

/// Postgres-backed order records
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_order(&self, code: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT code, secret, organizer, event, total, currency, status, testmode, comment
             FROM orders WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        row.map(Order::try_from).transpose()
    }

    async fn append_comment(&self, code: &str, comment: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders
             SET comment = CASE WHEN comment = '' THEN $2 ELSE comment || E'\\n' || $2 END
             WHERE code = $1",
        )
        .bind(code)
        .bind(comment)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx(e).with_context(format!("comment on order {}", code)))?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Order", code));
        }
        Ok(())
    }
}
