//! Payment provider types and data structures
//!
//! Local records (payments and orders as owned by the ticketing platform) and
//! the gateway's view of an order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Local payment state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Created,
    Pending,
    Confirmed,
    Failed,
    Canceled,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Created => "created",
            PaymentState::Pending => "pending",
            PaymentState::Confirmed => "confirmed",
            PaymentState::Failed => "failed",
            PaymentState::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(PaymentState::Created),
            "pending" => Some(PaymentState::Pending),
            "confirmed" => Some(PaymentState::Confirmed),
            "failed" => Some(PaymentState::Failed),
            "canceled" => Some(PaymentState::Canceled),
            _ => None,
        }
    }
}

/// Aggregate order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Expired,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Expired => "expired",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "expired" => Some(OrderStatus::Expired),
            "canceled" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }
}

/// The opaque info blob stored on a payment.
///
/// Holds the gateway order id written at checkout, or the error that ended
/// the checkout attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revolut_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentInfo {
    pub fn gateway_order(id: impl Into<String>) -> Self {
        Self {
            revolut_order_id: Some(id.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            revolut_order_id: None,
            error: Some(message.into()),
        }
    }

    /// Keeps the gateway order id and records `message` next to it.
    pub fn with_error(&self, message: impl Into<String>) -> Self {
        Self {
            revolut_order_id: self.revolut_order_id.clone(),
            error: Some(message.into()),
        }
    }
}

/// A single payment attempt against an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: i64,
    /// Sequence number of this payment within its order
    pub local_id: i32,
    pub order_code: String,
    pub provider: String,
    pub amount: Decimal,
    pub currency: String,
    pub state: PaymentState,
    pub info: PaymentInfo,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Human-facing id, e.g. `ABC12-P-1`
    pub fn full_id(&self) -> String {
        format!("{}-P-{}", self.order_code, self.local_id)
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == PaymentState::Confirmed
    }
}

/// Order as seen by the payment provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub code: String,
    /// Secret used to derive tamper-evident tokens; never sent to the gateway
    pub secret: String,
    pub organizer: String,
    pub event: String,
    pub total: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    /// Orders placed in test mode talk to the gateway sandbox
    pub testmode: bool,
    pub comment: String,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }
}

/// Result of confirming a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    AlreadyConfirmed,
}

/// Gateway order state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOrderState {
    Pending,
    Processing,
    Authorised,
    Completed,
    Cancelled,
    Failed,
    Other(String),
}

impl GatewayOrderState {
    pub fn as_str(&self) -> &str {
        match self {
            GatewayOrderState::Pending => "pending",
            GatewayOrderState::Processing => "processing",
            GatewayOrderState::Authorised => "authorised",
            GatewayOrderState::Completed => "completed",
            GatewayOrderState::Cancelled => "cancelled",
            GatewayOrderState::Failed => "failed",
            GatewayOrderState::Other(value) => value,
        }
    }
}

impl From<&str> for GatewayOrderState {
    fn from(value: &str) -> Self {
        match value {
            "pending" => GatewayOrderState::Pending,
            "processing" => GatewayOrderState::Processing,
            "authorised" => GatewayOrderState::Authorised,
            "completed" => GatewayOrderState::Completed,
            "cancelled" => GatewayOrderState::Cancelled,
            "failed" => GatewayOrderState::Failed,
            other => GatewayOrderState::Other(other.to_string()),
        }
    }
}

/// Gateway order as returned by the order endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub checkout_url: Option<String>,
}

impl GatewayOrder {
    pub fn state(&self) -> Option<GatewayOrderState> {
        self.state.as_deref().map(GatewayOrderState::from)
    }
}

/// Merchant-side data attached to a gateway order
#[derive(Debug, Clone, Serialize)]
pub struct MerchantOrderData {
    pub reference: String,
}

/// Body of the order-creation request
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub redirect_url: String,
    pub merchant_order_data: MerchantOrderData,
}

/// Path parameters of the buyer's return from the hosted checkout page
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnCallback {
    pub order_code: String,
    pub payment_id: String,
    pub hash: String,
}
