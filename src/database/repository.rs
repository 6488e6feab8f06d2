use crate::database::error::DbResult;
use crate::payments::types::{ConfirmOutcome, Order, Payment, PaymentInfo};
use async_trait::async_trait;

/// Payment records owned by the ticketing platform
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Find a payment by its ID
    async fn find_payment(&self, id: i64) -> DbResult<Option<Payment>>;

    /// Replace the payment's info blob
    async fn save_info(&self, id: i64, info: &PaymentInfo) -> DbResult<()>;

    /// Mark the payment confirmed.
    ///
    /// Confirming twice is a no-op that reports `AlreadyConfirmed`. When the
    /// confirmed payments cover the order total the order becomes paid.
    async fn confirm(&self, id: i64) -> DbResult<ConfirmOutcome>;

    /// Mark the payment failed and store `info`. Confirmed payments are left
    /// untouched.
    async fn fail(&self, id: i64, info: &PaymentInfo) -> DbResult<()>;
}

/// Order records owned by the ticketing platform
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an order by its code
    async fn find_order(&self, code: &str) -> DbResult<Option<Order>>;

    /// Append a line to the order's comment log
    async fn append_comment(&self, code: &str, comment: &str) -> DbResult<()>;
}

/// Appends `line` to a newline-separated comment log.
pub fn append_line(log: &str, line: &str) -> String {
    if log.is_empty() {
        line.to_string()
    } else {
        format!("{}\n{}", log, line)
    }
}
