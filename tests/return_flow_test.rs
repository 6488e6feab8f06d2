//! Buyer return handling against a stand-in gateway

mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use revolut_checkout::database::InMemoryStore;
use revolut_checkout::payments::providers::RevolutProvider;
use revolut_checkout::payments::return_handler::ReturnDecision;
use revolut_checkout::payments::types::{
    ConfirmOutcome, OrderStatus, PaymentInfo, PaymentState, ReturnCallback,
};

fn order_path() -> String {
    format!("/api/orders/{}", GATEWAY_ORDER_ID)
}

async fn mount_gateway_state(server: &MockServer, state: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path(order_path()))
        .and(header("Authorization", format!("Bearer {}", SECRET_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": GATEWAY_ORDER_ID,
            "state": state,
        })))
        .expect(times)
        .mount(server)
        .await;
}

async fn valid_callback(provider: &RevolutProvider, store: &InMemoryStore) -> ReturnCallback {
    let order = store.order(ORDER_CODE).await.unwrap();
    ReturnCallback {
        order_code: ORDER_CODE.to_string(),
        payment_id: PAYMENT_ID.to_string(),
        hash: provider.return_hash(&order, PAYMENT_ID),
    }
}

async fn comments(store: &InMemoryStore) -> String {
    store.order(ORDER_CODE).await.unwrap().comment
}

#[tokio::test]
async fn test_completed_order_confirms_payment() {
    let server = MockServer::start().await;
    mount_gateway_state(&server, json!("completed"), 2).await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);
    let callback = valid_callback(&provider, &store).await;

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(
        outcome.decision,
        ReturnDecision::Confirmed(ConfirmOutcome::Confirmed)
    );
    assert_eq!(outcome.redirect_url, order_page(true));

    let payment = store.payment(PAYMENT_ID).await.unwrap();
    assert_eq!(payment.state, PaymentState::Confirmed);
    assert!(payment.confirmed_at.is_some());
    assert_eq!(
        store.order(ORDER_CODE).await.unwrap().status,
        OrderStatus::Paid
    );
    assert!(comments(&store).await.contains(&format!(
        "Fetched revolut order {} has state \"completed\"",
        GATEWAY_ORDER_ID
    )));

    // Reloading the return page must not confirm twice
    let again = provider.handle_return(&callback).await.unwrap();
    assert_eq!(
        again.decision,
        ReturnDecision::Confirmed(ConfirmOutcome::AlreadyConfirmed)
    );
    assert_eq!(again.redirect_url, order_page(true));
}

#[tokio::test]
async fn test_bad_order_code_skips_gateway() {
    let server = MockServer::start().await;
    mount_gateway_state(&server, json!("completed"), 0).await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);
    let mut callback = valid_callback(&provider, &store).await;
    callback.order_code = "ZZZ99".to_string();

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::BadCode);
    assert_eq!(outcome.redirect_url, order_page(false));
    assert_eq!(
        comments(&store).await,
        "Returned from gateway with bad code ZZZ99"
    );
    assert_eq!(
        store.payment(PAYMENT_ID).await.unwrap().state,
        PaymentState::Created
    );
}

#[tokio::test]
async fn test_overlong_bad_code_is_truncated_in_comment() {
    let server = MockServer::start().await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);
    let mut callback = valid_callback(&provider, &store).await;
    callback.order_code = "Q".repeat(500);

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::BadCode);
    let comment = comments(&store).await;
    assert!(comment.len() < 200);
}

#[tokio::test]
async fn test_tampered_hash_is_rejected() {
    let server = MockServer::start().await;
    mount_gateway_state(&server, json!("completed"), 0).await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);
    let mut callback = valid_callback(&provider, &store).await;

    // Flip only the last character
    let mut hash = callback.hash.clone();
    let last = hash.pop().unwrap();
    hash.push(if last == '0' { '1' } else { '0' });
    let tampered = hash.clone();
    callback.hash = hash;

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::BadHash);
    assert_eq!(outcome.redirect_url, order_page(false));

    let comment = comments(&store).await;
    assert_eq!(
        comment,
        "Returned from gateway with an invalid authentication hash"
    );
    assert!(!comment.contains(&tampered));
    assert_eq!(
        store.payment(PAYMENT_ID).await.unwrap().state,
        PaymentState::Created
    );
}

#[tokio::test]
async fn test_hash_for_other_payment_is_rejected() {
    let server = MockServer::start().await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);
    let order = store.order(ORDER_CODE).await.unwrap();
    let callback = ReturnCallback {
        order_code: ORDER_CODE.to_string(),
        payment_id: PAYMENT_ID.to_string(),
        hash: provider.return_hash(&order, PAYMENT_ID + 1),
    };

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::BadHash);
}

#[tokio::test]
async fn test_missing_gateway_order_id() {
    let server = MockServer::start().await;
    mount_gateway_state(&server, json!("completed"), 0).await;
    let store = seeded_store(PaymentInfo::default()).await;
    let provider = provider(&server, &store);
    let callback = valid_callback(&provider, &store).await;

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::MissingGatewayOrder);
    assert_eq!(outcome.redirect_url, order_page(false));
    assert_eq!(
        comments(&store).await,
        "Missing revolut_order_id in payment info"
    );
}

#[tokio::test]
async fn test_cancelled_and_failed_orders_fail_payment() {
    for state in ["cancelled", "failed"] {
        let server = MockServer::start().await;
        mount_gateway_state(&server, json!(state), 1).await;
        let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
        let provider = provider(&server, &store);
        let callback = valid_callback(&provider, &store).await;

        let outcome = provider.handle_return(&callback).await.unwrap();
        assert_eq!(outcome.decision, ReturnDecision::Failed, "state {}", state);
        assert_eq!(outcome.redirect_url, order_page(false));

        let payment = store.payment(PAYMENT_ID).await.unwrap();
        assert_eq!(payment.state, PaymentState::Failed);
        assert_eq!(
            payment.info.revolut_order_id.as_deref(),
            Some(GATEWAY_ORDER_ID)
        );
        assert_eq!(
            store.order(ORDER_CODE).await.unwrap().status,
            OrderStatus::Pending
        );
    }
}

#[tokio::test]
async fn test_non_final_states_change_nothing() {
    for state in ["pending", "processing", "authorised", "something_new"] {
        let server = MockServer::start().await;
        mount_gateway_state(&server, json!(state), 1).await;
        let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
        let provider = provider(&server, &store);
        let callback = valid_callback(&provider, &store).await;

        let outcome = provider.handle_return(&callback).await.unwrap();
        assert_eq!(
            outcome.decision,
            ReturnDecision::Pending(Some(state.to_string()))
        );
        assert_eq!(outcome.redirect_url, order_page(false));
        assert_eq!(
            store.payment(PAYMENT_ID).await.unwrap().state,
            PaymentState::Created
        );
        assert!(comments(&store).await.ends_with(&format!("\"{}\"", state)));
    }
}

#[tokio::test]
async fn test_missing_state_in_gateway_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(order_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": GATEWAY_ORDER_ID })))
        .expect(1)
        .mount(&server)
        .await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);
    let callback = valid_callback(&provider, &store).await;

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::Pending(None));
    assert_eq!(
        comments(&store).await,
        format!("Missing state in fetched revolut order {}", GATEWAY_ORDER_ID)
    );
    assert_eq!(
        store.payment(PAYMENT_ID).await.unwrap().state,
        PaymentState::Created
    );
}

#[tokio::test]
async fn test_gateway_error_is_recorded_on_payment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(order_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);
    let callback = valid_callback(&provider, &store).await;

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::Error);
    assert_eq!(outcome.redirect_url, order_page(false));

    let payment = store.payment(PAYMENT_ID).await.unwrap();
    assert_eq!(payment.state, PaymentState::Created);
    assert_eq!(
        payment.info.revolut_order_id.as_deref(),
        Some(GATEWAY_ORDER_ID)
    );
    let recorded = payment.info.error.unwrap();
    assert!(recorded.contains("500"));
    assert!(recorded.contains(&format!("retrieving revolut order {}", GATEWAY_ORDER_ID)));
}

#[tokio::test]
async fn test_gateway_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(order_path()))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let mut settings = settings(&server.uri());
    settings.max_retries = 2;
    let provider = provider_with(settings, &store);
    let callback = valid_callback(&provider, &store).await;

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::Error);
}

#[tokio::test]
async fn test_gateway_get_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(order_path()))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_gateway_state(&server, json!("completed"), 1).await;

    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let mut settings = settings(&server.uri());
    settings.max_retries = 1;
    let provider = provider_with(settings, &store);
    let callback = valid_callback(&provider, &store).await;

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(
        outcome.decision,
        ReturnDecision::Confirmed(ConfirmOutcome::Confirmed)
    );
}

#[tokio::test]
async fn test_malformed_gateway_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(order_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);
    let callback = valid_callback(&provider, &store).await;

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::Error);

    let info = store.payment(PAYMENT_ID).await.unwrap().info;
    assert_eq!(info.revolut_order_id.as_deref(), Some(GATEWAY_ORDER_ID));
    assert!(info.error.unwrap().contains("Invalid response format"));
}

#[tokio::test]
async fn test_unknown_or_malformed_payment_id_is_not_found() {
    let server = MockServer::start().await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);

    for raw in ["7", "42abc", "-42", ""] {
        let callback = ReturnCallback {
            order_code: ORDER_CODE.to_string(),
            payment_id: raw.to_string(),
            hash: "whatever".to_string(),
        };
        let err = provider.handle_return(&callback).await.unwrap_err();
        assert!(err.is_not_found(), "payment id {:?}", raw);
    }
    assert_eq!(comments(&store).await, "");
}

#[tokio::test]
async fn test_payment_of_other_provider_is_not_found() {
    let server = MockServer::start().await;
    let store = Arc::new(InMemoryStore::new());
    store.insert_order(order(dec!(12.34))).await;
    let mut other = payment(PAYMENT_ID, dec!(12.34), PaymentInfo::gateway_order(GATEWAY_ORDER_ID));
    other.provider = "banktransfer".to_string();
    store.insert_payment(other).await;

    let provider = provider(&server, &store);
    let callback = valid_callback(&provider, &store).await;

    let err = provider.handle_return(&callback).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_partial_payment_leaves_order_unpaid() {
    let server = MockServer::start().await;
    mount_gateway_state(&server, json!("completed"), 1).await;

    let store = Arc::new(InMemoryStore::new());
    store.insert_order(order(dec!(50.00))).await;
    store
        .insert_payment(payment(
            PAYMENT_ID,
            dec!(12.34),
            PaymentInfo::gateway_order(GATEWAY_ORDER_ID),
        ))
        .await;
    let provider = provider(&server, &store);
    let callback = valid_callback(&provider, &store).await;

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(
        outcome.decision,
        ReturnDecision::Confirmed(ConfirmOutcome::Confirmed)
    );
    assert_eq!(outcome.redirect_url, order_page(false));
    assert_eq!(
        store.order(ORDER_CODE).await.unwrap().status,
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn test_failed_gateway_state_never_downgrades_confirmed_payment() {
    let server = MockServer::start().await;
    mount_gateway_state(&server, json!("failed"), 1).await;
    let store = seeded_store(PaymentInfo::gateway_order(GATEWAY_ORDER_ID)).await;
    let provider = provider(&server, &store);
    let callback = valid_callback(&provider, &store).await;

    {
        use revolut_checkout::database::PaymentRepository;
        store.confirm(PAYMENT_ID).await.unwrap();
    }

    let outcome = provider.handle_return(&callback).await.unwrap();
    assert_eq!(outcome.decision, ReturnDecision::Failed);
    assert_eq!(
        store.payment(PAYMENT_ID).await.unwrap().state,
        PaymentState::Confirmed
    );
    assert_eq!(outcome.redirect_url, order_page(true));
}
