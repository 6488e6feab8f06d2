//! Buyer return from the hosted checkout page
//!
//! Checks run strictly in order and the first failure short-circuits:
//! payment lookup, order code, authentication hash, stored gateway order id.
//! Only then is the gateway asked for the order state. Past the lookup every
//! path ends in a redirect to the order status page.

use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::payments::providers::revolut::{RevolutProvider, IDENTIFIER};
use crate::payments::security::constant_time_eq;
use crate::payments::types::{
    ConfirmOutcome, GatewayOrderState, Order, Payment, ReturnCallback,
};

const MAX_ECHOED_CODE_LEN: usize = 64;

/// What the return handler concluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnDecision {
    /// Callback order code does not match the payment's order
    BadCode,
    /// Callback hash does not match the expected tag
    BadHash,
    /// Checkout never stored a gateway order id
    MissingGatewayOrder,
    Confirmed(ConfirmOutcome),
    Failed,
    /// Gateway state is not final (or missing); nothing changed
    Pending(Option<String>),
    /// Gateway or storage error while polling; recorded on the payment
    Error,
}

#[derive(Debug, Clone)]
pub struct ReturnOutcome {
    pub redirect_url: String,
    pub decision: ReturnDecision,
}

/// Payment ids in return URLs are plain decimal digits.
fn parse_payment_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

impl RevolutProvider {
    /// Handles the buyer's return for `callback`.
    ///
    /// Errors only when the payment (or its order) cannot be found; every
    /// other outcome is a redirect.
    pub async fn handle_return(&self, callback: &ReturnCallback) -> AppResult<ReturnOutcome> {
        info!(
            order_code = %callback.order_code,
            payment_id = %callback.payment_id,
            "Buyer returned from Revolut checkout"
        );

        let payment_id = parse_payment_id(&callback.payment_id)
            .ok_or_else(|| AppError::not_found("Payment", &callback.payment_id))?;

        let payment = self
            .payments
            .find_payment(payment_id)
            .await?
            .filter(|p| p.provider == IDENTIFIER)
            .ok_or_else(|| AppError::not_found("Payment", payment_id))?;

        let order = self
            .orders
            .find_order(&payment.order_code)
            .await?
            .ok_or_else(|| AppError::not_found("Order", &payment.order_code))?;

        let decision = self.verify_and_apply(callback, &payment, &order).await;
        Ok(self.finish(order, decision).await)
    }

    async fn verify_and_apply(
        &self,
        callback: &ReturnCallback,
        payment: &Payment,
        order: &Order,
    ) -> ReturnDecision {
        if callback.order_code != order.code {
            warn!("Return for payment {} with bad order code", payment.id);
            self.comment(
                order,
                &format!(
                    "Returned from gateway with bad code {}",
                    truncate(&callback.order_code, MAX_ECHOED_CODE_LEN)
                ),
            )
            .await;
            return ReturnDecision::BadCode;
        }

        let expected_hash = self.return_hash(order, payment.id);
        if !constant_time_eq(callback.hash.as_bytes(), expected_hash.as_bytes()) {
            warn!("Return for payment {} with bad hash", payment.id);
            self.comment(order, "Returned from gateway with an invalid authentication hash")
                .await;
            return ReturnDecision::BadHash;
        }

        let Some(gateway_order_id) = payment.info.revolut_order_id.clone() else {
            warn!("Payment {} has no revolut_order_id", payment.id);
            self.comment(order, "Missing revolut_order_id in payment info")
                .await;
            return ReturnDecision::MissingGatewayOrder;
        };

        match self.poll_and_apply(payment, order, &gateway_order_id).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(
                    "Failed to process Revolut order {} for payment {}: {}",
                    gateway_order_id, payment.id, e
                );
                let info = payment.info.with_error(self.redact(&e.to_string()));
                if let Err(e) = self.payments.save_info(payment.id, &info).await {
                    error!("Failed to record error on payment {}: {}", payment.id, e);
                }
                ReturnDecision::Error
            }
        }
    }

    async fn poll_and_apply(
        &self,
        payment: &Payment,
        order: &Order,
        gateway_order_id: &str,
    ) -> AppResult<ReturnDecision> {
        let gateway_order = self
            .client
            .retrieve_order(order.testmode, gateway_order_id)
            .await
            .map_err(|e| e.with_context(format!("retrieving revolut order {}", gateway_order_id)))?;

        let Some(state) = gateway_order.state() else {
            warn!("Revolut order {} has no state", gateway_order_id);
            self.comment(
                order,
                &format!("Missing state in fetched revolut order {}", gateway_order_id),
            )
            .await;
            return Ok(ReturnDecision::Pending(None));
        };

        info!(
            "Revolut order {} for payment {} has state {}",
            gateway_order_id,
            payment.id,
            state.as_str()
        );
        self.comment(
            order,
            &format!(
                "Fetched revolut order {} has state \"{}\"",
                gateway_order_id,
                state.as_str()
            ),
        )
        .await;

        let decision = match state {
            GatewayOrderState::Completed => {
                let outcome = self.payments.confirm(payment.id).await?;
                if outcome == ConfirmOutcome::AlreadyConfirmed {
                    info!("Payment {} was already confirmed", payment.id);
                }
                ReturnDecision::Confirmed(outcome)
            }
            GatewayOrderState::Cancelled | GatewayOrderState::Failed => {
                self.payments.fail(payment.id, &payment.info).await?;
                ReturnDecision::Failed
            }
            other => ReturnDecision::Pending(Some(other.as_str().to_string())),
        };
        Ok(decision)
    }

    /// Builds the redirect from the order as it is now, since confirming a
    /// payment may have marked it paid.
    async fn finish(&self, order: Order, decision: ReturnDecision) -> ReturnOutcome {
        let order = match self.orders.find_order(&order.code).await {
            Ok(Some(current)) => current,
            Ok(None) => order,
            Err(e) => {
                warn!("Failed to reload order {}: {}", order.code, e);
                order
            }
        };

        ReturnOutcome {
            redirect_url: self.urls.order_status_url(&order),
            decision,
        }
    }

    async fn comment(&self, order: &Order, text: &str) {
        if let Err(e) = self.orders.append_comment(&order.code, text).await {
            error!("Failed to comment on order {}: {}", order.code, e);
        }
    }
}
