//! Payment provider trait definitions
//!
//! The capability contract the ticketing platform consumes from a provider.

use crate::error::PaymentError;
use crate::payments::types::Order;
use async_trait::async_trait;
use serde::Serialize;

/// How a settings field is rendered
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldWidget {
    Checkbox,
    Text,
    Password,
}

/// A field of the provider's settings form
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SettingsField {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: Option<&'static str>,
    pub required: bool,
    pub widget: FieldWidget,
}

/// Trait for payment provider implementations
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Stable identifier, also the first segment of the provider's URLs
    fn identifier(&self) -> &'static str;

    /// Name shown to buyers
    fn verbose_name(&self) -> &'static str;

    /// Notice shown to the merchant while the event is in test mode
    fn test_mode_message(&self) -> &'static str;

    /// Settings form fields, in display order
    fn settings_form_fields(&self) -> Vec<SettingsField>;

    /// Whether the buyer's session carries everything the provider needs
    fn payment_is_valid_session(&self) -> bool {
        true
    }

    /// Start the payment and return the URL the buyer must be redirected to.
    ///
    /// On failure the payment record has been annotated with the cause and
    /// the platform should show its payment-failed page.
    async fn execute_payment(&self, payment_id: i64) -> Result<String, PaymentError>;

    /// Text shown on the checkout confirmation page
    fn checkout_confirm_render(&self, order: Option<&Order>) -> String;
}
