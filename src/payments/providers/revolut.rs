//! Revolut hosted-checkout provider
//!
//! Checkout initiation lives here; the buyer's return is handled in
//! `payments::return_handler`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::database::repository::{OrderRepository, PaymentRepository};
use crate::error::{AppError, AppResult, PaymentError};
use crate::payments::client::RevolutClient;
use crate::payments::currency::amount_to_minor_units;
use crate::payments::security::{redact_text, return_tag, tagged_secret};
use crate::payments::traits::{FieldWidget, PaymentProvider, SettingsField};
use crate::payments::types::{
    CreateOrderRequest, MerchantOrderData, Order, Payment, PaymentInfo,
};
use crate::payments::urls::UrlBuilder;

pub const IDENTIFIER: &str = "revolut";

const CONFIRM_TEXT: &str =
    "You will be redirected to payment page, where you input card data and complete the purchase";

pub struct RevolutProvider {
    pub(crate) client: RevolutClient,
    pub(crate) payments: Arc<dyn PaymentRepository>,
    pub(crate) orders: Arc<dyn OrderRepository>,
    pub(crate) urls: UrlBuilder,
}

impl RevolutProvider {
    pub fn new(
        client: RevolutClient,
        payments: Arc<dyn PaymentRepository>,
        orders: Arc<dyn OrderRepository>,
        urls: UrlBuilder,
    ) -> Self {
        Self {
            client,
            payments,
            orders,
            urls,
        }
    }

    /// The authentication tag embedded in a payment's return URL
    pub fn return_hash(&self, order: &Order, payment_id: i64) -> String {
        tagged_secret(&order.secret, &return_tag(IDENTIFIER, payment_id))
    }

    pub(crate) fn redact(&self, message: &str) -> String {
        redact_text(message, &self.client.settings().secret_key)
    }

    /// Creates the gateway order, returning its id and checkout URL.
    async fn create_gateway_order(
        &self,
        payment: &Payment,
        order: &Order,
    ) -> AppResult<(String, String)> {
        let hash = self.return_hash(order, payment.id);
        let redirect_url = self
            .urls
            .return_url(IDENTIFIER, &order.code, payment.id, &hash);

        let request = CreateOrderRequest {
            amount: amount_to_minor_units(payment.amount, &payment.currency)?,
            currency: payment.currency.clone(),
            description: format!("Order {}", payment.full_id()),
            redirect_url,
            merchant_order_data: MerchantOrderData {
                reference: payment.id.to_string(),
            },
        };

        let gateway_order = self.client.create_order(order.testmode, &request).await?;

        if gateway_order.id.is_empty() {
            return Err(AppError::provider("Order response without id", false));
        }
        let checkout_url = gateway_order
            .checkout_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::provider("Order response without checkout_url", false))?;

        Ok((gateway_order.id, checkout_url))
    }

    /// Records `cause` on the payment and turns it into the failure signal.
    async fn record_failure(&self, payment_id: i64, cause: &AppError) -> PaymentError {
        error!("Revolut checkout failed for payment {}: {}", payment_id, cause);
        let info = PaymentInfo::error(self.redact(&cause.to_string()));
        if let Err(e) = self.payments.save_info(payment_id, &info).await {
            error!("Failed to record error on payment {}: {}", payment_id, e);
        }
        PaymentError::failed()
    }
}

#[async_trait]
impl PaymentProvider for RevolutProvider {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn verbose_name(&self) -> &'static str {
        "Card payment"
    }

    fn test_mode_message(&self) -> &'static str {
        "While in test mode, all API requests will be done to sandbox environment"
    }

    fn settings_form_fields(&self) -> Vec<SettingsField> {
        vec![
            SettingsField {
                name: "_enabled",
                label: "Enable payment method",
                help_text: None,
                required: false,
                widget: FieldWidget::Checkbox,
            },
            SettingsField {
                name: "public_key",
                label: "Public Key",
                help_text: Some("Your Revolut API public key (should have pk_ prefix)."),
                required: true,
                widget: FieldWidget::Text,
            },
            SettingsField {
                name: "secret_key",
                label: "Secret Key",
                help_text: Some("Your Revolut API secret key (should have sk_ prefix)."),
                required: true,
                widget: FieldWidget::Password,
            },
        ]
    }

    async fn execute_payment(&self, payment_id: i64) -> Result<String, PaymentError> {
        let payment = match self.payments.find_payment(payment_id).await {
            Ok(Some(payment)) => payment,
            Ok(None) => return Err(PaymentError::NotFound { payment_id }),
            Err(e) => {
                error!("Failed to load payment {}: {}", payment_id, e);
                return Err(PaymentError::failed());
            }
        };

        if payment.is_confirmed() {
            warn!("Checkout requested for already confirmed payment {}", payment_id);
            return Err(PaymentError::AlreadyConfirmed { payment_id });
        }

        let order = match self.orders.find_order(&payment.order_code).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                let cause = AppError::not_found("Order", &payment.order_code);
                return Err(self.record_failure(payment_id, &cause).await);
            }
            Err(e) => return Err(self.record_failure(payment_id, &AppError::from(e)).await),
        };

        match self.create_gateway_order(&payment, &order).await {
            Ok((gateway_order_id, checkout_url)) => {
                info!(
                    "Revolut order {} created for payment {}",
                    gateway_order_id,
                    payment.full_id()
                );
                let info = PaymentInfo::gateway_order(&gateway_order_id);
                if let Err(e) = self.payments.save_info(payment_id, &info).await {
                    return Err(self.record_failure(payment_id, &AppError::from(e)).await);
                }
                info!("Redirecting to url: {}", checkout_url);
                Ok(checkout_url)
            }
            Err(e) => Err(self.record_failure(payment_id, &e).await),
        }
    }

    fn checkout_confirm_render(&self, _order: Option<&Order>) -> String {
        CONFIRM_TEXT.to_string()
    }
}
