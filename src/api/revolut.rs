use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::error::PaymentError;
use crate::payments::traits::{PaymentProvider, SettingsField};
use crate::payments::types::ReturnCallback;

#[derive(Serialize)]
pub struct ProviderInfo {
    pub identifier: &'static str,
    pub verbose_name: &'static str,
    pub test_mode_message: &'static str,
    pub checkout_confirm: String,
    pub settings_form_fields: Vec<SettingsField>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

pub async fn provider_info(State(state): State<AppState>) -> Json<ProviderInfo> {
    let provider = &state.provider;
    Json(ProviderInfo {
        identifier: provider.identifier(),
        verbose_name: provider.verbose_name(),
        test_mode_message: provider.test_mode_message(),
        checkout_confirm: provider.checkout_confirm_render(None),
        settings_form_fields: provider.settings_form_fields(),
    })
}

pub async fn start_checkout(
    State(state): State<AppState>,
    Path(payment_id): Path<i64>,
) -> Result<Json<CheckoutResponse>, PaymentError> {
    let checkout_url = state.provider.execute_payment(payment_id).await?;
    Ok(Json(CheckoutResponse { checkout_url }))
}

pub async fn buyer_return(
    State(state): State<AppState>,
    Path(callback): Path<ReturnCallback>,
) -> Response {
    match state.provider.handle_return(&callback).await {
        Ok(outcome) => {
            tracing::debug!(decision = ?outcome.decision, "Return handled");
            Redirect::to(&outcome.redirect_url).into_response()
        }
        Err(e) => e.into_response(),
    }
}
