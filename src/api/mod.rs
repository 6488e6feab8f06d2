//! HTTP surface of the provider

pub mod health;
pub mod revolut;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::routing::{get, post};
use axum::Router;
use http::Request;
use std::sync::Arc;
use tracing::Span;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::payments::providers::revolut::IDENTIFIER;
use crate::payments::providers::RevolutProvider;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<RevolutProvider>,
    pub environment: String,
    #[cfg(feature = "database")]
    pub pool: Option<sqlx::PgPool>,
}

impl AppState {
    pub fn new(provider: Arc<RevolutProvider>, environment: impl Into<String>) -> Self {
        Self {
            provider,
            environment: environment.into(),
            #[cfg(feature = "database")]
            pool: None,
        }
    }

    #[cfg(feature = "database")]
    pub fn with_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.pool = Some(pool);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(&format!("/{}/provider", IDENTIFIER), get(revolut::provider_info))
        .route(
            &format!("/{}/payments/:payment_id/checkout", IDENTIFIER),
            post(revolut::start_checkout),
        )
        .route(
            &format!("/{}/return/:order_code/:payment_id/:hash/", IDENTIFIER),
            get(revolut::buyer_return),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(http_span::<Body>))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Request span naming the route template, never the raw URI: return URLs
/// carry the callback tag.
fn http_span<B>(request: &Request<B>) -> Span {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or("unmatched");
    tracing::debug_span!("request", method = %request.method(), route)
}

