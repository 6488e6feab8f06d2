use crate::database::error::{DatabaseError, DbResult};
use crate::database::repository::{append_line, OrderRepository, PaymentRepository};
use crate::payments::types::{
    ConfirmOutcome, Order, OrderStatus, Payment, PaymentInfo, PaymentState,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory payments and orders.
///
/// Backs tests and embedders that keep their records elsewhere. Payments are
/// always locked before orders.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    payments: Arc<RwLock<HashMap<i64, Payment>>>,
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_order(&self, order: Order) {
        self.orders.write().await.insert(order.code.clone(), order);
    }

    pub async fn insert_payment(&self, payment: Payment) {
        self.payments.write().await.insert(payment.id, payment);
    }

    pub async fn payment(&self, id: i64) -> Option<Payment> {
        self.payments.read().await.get(&id).cloned()
    }

    pub async fn order(&self, code: &str) -> Option<Order> {
        self.orders.read().await.get(code).cloned()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn find_payment(&self, id: i64) -> DbResult<Option<Payment>> {
        Ok(self.payments.read().await.get(&id).cloned())
    }

    async fn save_info(&self, id: i64, info: &PaymentInfo) -> DbResult<()> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("Payment", id))?;
        payment.info = info.clone();
        Ok(())
    }

    async fn confirm(&self, id: i64) -> DbResult<ConfirmOutcome> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("Payment", id))?;

        if payment.is_confirmed() {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }
        payment.state = PaymentState::Confirmed;
        payment.confirmed_at = Some(chrono::Utc::now());
        let order_code = payment.order_code.clone();

        let paid: Decimal = payments
            .values()
            .filter(|p| p.order_code == order_code && p.is_confirmed())
            .map(|p| p.amount)
            .sum();

        let mut orders = self.orders.write().await;
        if let Some(order) = orders.get_mut(&order_code) {
            if matches!(order.status, OrderStatus::Pending | OrderStatus::Expired)
                && paid >= order.total
            {
                order.status = OrderStatus::Paid;
            }
        }

        Ok(ConfirmOutcome::Confirmed)
    }

    async fn fail(&self, id: i64, info: &PaymentInfo) -> DbResult<()> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::not_found("Payment", id))?;
        if payment.is_confirmed() {
            return Ok(());
        }
        payment.state = PaymentState::Failed;
        payment.info = info.clone();
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn find_order(&self, code: &str) -> DbResult<Option<Order>> {
        Ok(self.orders.read().await.get(code).cloned())
    }

    async fn append_comment(&self, code: &str, comment: &str) -> DbResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(code)
            .ok_or_else(|| DatabaseError::not_found("Order", code))?;
        order.comment = append_line(&order.comment, comment);
        Ok(())
    }
}
