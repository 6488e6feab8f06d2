#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wiremock::MockServer;

use revolut_checkout::config::RevolutSettings;
use revolut_checkout::database::InMemoryStore;
use revolut_checkout::payments::client::RevolutClient;
use revolut_checkout::payments::providers::RevolutProvider;
use revolut_checkout::payments::types::{
    Order, OrderStatus, Payment, PaymentInfo, PaymentState,
};
use revolut_checkout::payments::urls::UrlBuilder;

pub const SECRET_KEY: &str = "sk_test_integration_secret";
pub const ORDER_CODE: &str = "ABC12";
pub const PAYMENT_ID: i64 = 42;
pub const GATEWAY_ORDER_ID: &str = "6516e61c-d279-a454-a837-bc52ce55ed49";
pub const PUBLIC_BASE: &str = "https://pay.example.com";
pub const SHOP_BASE: &str = "https://tickets.example.com";

pub fn settings(base_url: &str) -> RevolutSettings {
    let mut settings = RevolutSettings::new("pk_test_integration", SECRET_KEY).with_base_url(base_url);
    settings.timeout_secs = 5;
    settings.max_retries = 0;
    settings
}

pub fn provider_with(settings: RevolutSettings, store: &Arc<InMemoryStore>) -> RevolutProvider {
    RevolutProvider::new(
        RevolutClient::new(settings).expect("client"),
        store.clone(),
        store.clone(),
        UrlBuilder::new(PUBLIC_BASE, SHOP_BASE).expect("urls"),
    )
}

pub fn provider(server: &MockServer, store: &Arc<InMemoryStore>) -> RevolutProvider {
    provider_with(settings(&server.uri()), store)
}

pub fn order(total: Decimal) -> Order {
    Order {
        code: ORDER_CODE.to_string(),
        secret: "z3kq9xw2m7".to_string(),
        organizer: "acme".to_string(),
        event: "conf2026".to_string(),
        total,
        currency: "EUR".to_string(),
        status: OrderStatus::Pending,
        testmode: true,
        comment: String::new(),
    }
}

pub fn payment(id: i64, amount: Decimal, info: PaymentInfo) -> Payment {
    Payment {
        id,
        local_id: 1,
        order_code: ORDER_CODE.to_string(),
        provider: "revolut".to_string(),
        amount,
        currency: "EUR".to_string(),
        state: PaymentState::Created,
        info,
        created_at: Utc::now(),
        confirmed_at: None,
    }
}

/// Order of 12.34 EUR with one payment covering it.
pub async fn seeded_store(info: PaymentInfo) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_order(order(dec!(12.34))).await;
    store.insert_payment(payment(PAYMENT_ID, dec!(12.34), info)).await;
    store
}

pub fn order_page(paid: bool) -> String {
    let base = format!("{}/acme/conf2026/order/{}/z3kq9xw2m7/", SHOP_BASE, ORDER_CODE);
    if paid {
        format!("{}?paid=yes", base)
    } else {
        base
    }
}
