//! Revolut Merchant API client
//!
//! Thin wrapper over the two order endpoints the hosted checkout needs.
//! Every request and response is logged with the secret key redacted.

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

use crate::config::RevolutSettings;
use crate::error::{AppError, AppErrorKind, AppResult, ExternalError};
use crate::payments::security::{redact_headers, redact_return_url, redact_text};
use crate::payments::types::{CreateOrderRequest, GatewayOrder};

const SERVICE: &str = "Revolut";
const RETRY_BASE_DELAY_MS: u64 = 500;

pub struct RevolutClient {
    settings: RevolutSettings,
    client: Client,
}

impl RevolutClient {
    pub fn new(settings: RevolutSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("revolut-checkout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &RevolutSettings {
        &self.settings
    }

    /// `POST /api/orders`. Never retried, a retry could create a second
    /// gateway order.
    pub async fn create_order(
        &self,
        testmode: bool,
        request: &CreateOrderRequest,
    ) -> AppResult<GatewayOrder> {
        let body = serde_json::to_value(request).map_err(|e| {
            AppError::provider(format!("Failed to encode order request: {}", e), false)
        })?;
        self.make_request(Method::POST, testmode, &["api", "orders"], Some(&body))
            .await
    }

    /// `GET /api/orders/{id}`
    pub async fn retrieve_order(&self, testmode: bool, order_id: &str) -> AppResult<GatewayOrder> {
        self.make_request(Method::GET, testmode, &["api", "orders", order_id], None)
            .await
    }

    fn headers(&self, method: &Method) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.settings.secret_key),
        );
        headers.insert(
            "Revolut-Api-Version".to_string(),
            self.settings.api_version.clone(),
        );
        if method == Method::POST {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        } else {
            headers.insert("Accept".to_string(), "application/json".to_string());
        }
        headers
    }

    fn endpoint(&self, testmode: bool, segments: &[&str]) -> AppResult<Url> {
        let base = self.settings.base_api_url(testmode);
        let mut url = Url::parse(base)
            .map_err(|e| AppError::configuration(format!("Invalid Revolut API URL {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::configuration(format!("Invalid Revolut API URL {}", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn provider_error(&self, message: impl AsRef<str>, is_retryable: bool) -> AppError {
        AppError::provider(
            redact_text(message.as_ref(), &self.settings.secret_key),
            is_retryable,
        )
    }

    /// Make an authenticated request to the Revolut API
    async fn make_request<T>(
        &self,
        method: Method,
        testmode: bool,
        segments: &[&str],
        body: Option<&serde_json::Value>,
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(testmode, segments)?;
        let headers = self.headers(&method);
        let max_retries = if method == Method::GET {
            self.settings.max_retries
        } else {
            0
        };

        info!(
            method = %method,
            url = %url,
            headers = ?redact_headers(&headers, &self.settings.secret_key),
            body = ?loggable_body(body),
            "Revolut request"
        );

        let mut request = self.client.request(method.clone(), url.clone());
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let mut last_error: Option<AppError> = None;
        for attempt in 0..=max_retries {
            if attempt > 0 {
                let backoff = retry_backoff(attempt);
                warn!(
                    "Retrying Revolut {} {} after {:?} (attempt {})",
                    method,
                    url,
                    backoff,
                    attempt + 1
                );
                tokio::time::sleep(backoff).await;
            }

            let Some(req) = request.try_clone() else {
                return Err(self.provider_error("Failed to clone request", false));
            };

            let response = match req.send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    warn!("Revolut request timed out: {} {}", method, url);
                    last_error = Some(AppError::new(AppErrorKind::External(
                        ExternalError::Timeout {
                            service: SERVICE.to_string(),
                            seconds: self.settings.timeout_secs,
                        },
                    )));
                    continue;
                }
                Err(e) => {
                    warn!("Revolut request error: {}", e);
                    last_error = Some(self.provider_error(format!("Request error: {}", e), true));
                    continue;
                }
            };

            let status = response.status();
            let response_text = response.text().await.unwrap_or_default();
            info!(
                status = status.as_u16(),
                body = %redact_text(&response_text, &self.settings.secret_key),
                "Revolut response"
            );

            if status.is_success() {
                return serde_json::from_str::<T>(&response_text).map_err(|e| {
                    error!("Failed to parse Revolut response: {}", e);
                    self.provider_error(format!("Invalid response format: {}", e), false)
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                last_error = Some(AppError::new(AppErrorKind::External(
                    ExternalError::RateLimit {
                        service: SERVICE.to_string(),
                        retry_after: None,
                    },
                )));
                continue;
            }

            let err = self.provider_error(
                format!("HTTP {}: {}", status, response_text),
                status.is_server_error(),
            );
            if err.is_retryable() {
                last_error = Some(err);
                continue;
            }
            error!("Revolut API error: {}", err);
            return Err(err);
        }

        let err = last_error.unwrap_or_else(|| self.provider_error("Request failed", true));
        error!("Revolut request failed after {} attempts: {}", max_retries + 1, err);
        Err(err)
    }
}

/// Delay before retry `attempt` (1-based): 500 ms doubling each time.
fn retry_backoff(attempt: u32) -> Duration {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(factor))
}

/// Request body as logged; the return URL carries the order's callback tag.
fn loggable_body(body: Option<&serde_json::Value>) -> Option<serde_json::Value> {
    let mut body = body.cloned()?;
    if let Some(serde_json::Value::String(url)) = body.get_mut("redirect_url") {
        *url = redact_return_url(url);
    }
    Some(body)
}
