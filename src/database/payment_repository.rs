use crate::database::error::{DatabaseError, DatabaseErrorKind, DbResult};
use crate::database::repository::PaymentRepository;
use crate::payments::types::{ConfirmOutcome, Payment, PaymentInfo, PaymentState};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;

const PAYMENT_COLUMNS: &str =
    "id, local_id, order_code, provider, amount, currency, state, info, created_at, confirmed_at";

/// Row of the `order_payments` table
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: i64,
    pub local_id: i32,
    pub order_code: String,
    pub provider: String,
    pub amount: Decimal,
    pub currency: String,
    pub state: String,
    pub info: Json<PaymentInfo>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub confirmed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DatabaseError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let state = PaymentState::parse(&row.state).ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::SerializationError {
                message: format!("unknown payment state '{}'", row.state),
            })
        })?;

        Ok(Payment {
            id: row.id,
            local_id: row.local_id,
            order_code: row.order_code,
            provider: row.provider,
            amount: row.amount,
            currency: row.currency,
            state,
            info: row.info.0,
            created_at: row.created_at,
            confirmed_at: row.confirmed_at,
        })
    }
}

/// Postgres-backed payment records
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn find_payment(&self, id: i64) -> DbResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM order_payments WHERE id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        row.map(Payment::try_from).transpose()
    }

    async fn save_info(&self, id: i64, info: &PaymentInfo) -> DbResult<()> {
        let result = sqlx::query("UPDATE order_payments SET info = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(info))
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Payment", id));
        }
        Ok(())
    }

    async fn confirm(&self, id: i64) -> DbResult<ConfirmOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::from_sqlx(e).with_context("begin confirm"))?;

        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT state, order_code FROM order_payments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let (state, order_code) = row.ok_or_else(|| DatabaseError::not_found("Payment", id))?;
        if state == PaymentState::Confirmed.as_str() {
            debug!("Payment {} already confirmed", id);
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }

        sqlx::query("UPDATE order_payments SET state = $2, confirmed_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(PaymentState::Confirmed.as_str())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        sqlx::query(
            "UPDATE orders SET status = 'paid'
             WHERE code = $1
               AND status IN ('pending', 'expired')
               AND total <= (
                   SELECT COALESCE(SUM(amount), 0) FROM order_payments
                   WHERE order_code = $1 AND state = 'confirmed'
               )",
        )
        .bind(&order_code)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DatabaseError::from_sqlx(e).with_context(format!("mark order {} paid", order_code))
        })?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_sqlx(e).with_context("commit confirm"))?;
        Ok(ConfirmOutcome::Confirmed)
    }

    async fn fail(&self, id: i64, info: &PaymentInfo) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE order_payments SET state = $2, info = $3 WHERE id = $1 AND state <> 'confirmed'",
        )
        .bind(id)
        .bind(PaymentState::Failed.as_str())
        .bind(Json(info))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            debug!("Payment {} not failed (missing or already confirmed)", id);
        }
        Ok(())
    }
}
