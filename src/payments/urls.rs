//! Absolute URLs handed to the gateway and to the buyer's browser

use url::Url;

use crate::error::{AppError, AppResult};
use crate::payments::types::Order;

#[derive(Debug, Clone)]
pub struct UrlBuilder {
    public_base: Url,
    shop_base: Url,
}

impl UrlBuilder {
    /// `public_base` is where this service is reachable, `shop_base` is the
    /// ticketing platform hosting the order pages.
    pub fn new(public_base: &str, shop_base: &str) -> AppResult<Self> {
        Ok(Self {
            public_base: parse_base("PUBLIC_BASE_URL", public_base)?,
            shop_base: parse_base("SHOP_BASE_URL", shop_base)?,
        })
    }

    /// `<public>/<provider>/return/<order code>/<payment id>/<hash>/`
    pub fn return_url(
        &self,
        provider: &str,
        order_code: &str,
        payment_id: i64,
        hash: &str,
    ) -> String {
        let payment_id = payment_id.to_string();
        join(
            &self.public_base,
            &[provider, "return", order_code, &payment_id, hash],
        )
        .to_string()
    }

    /// The buyer-facing order page, flagged with `paid=yes` when the order
    /// is paid at the time of the call.
    pub fn order_status_url(&self, order: &Order) -> String {
        let mut url = join(
            &self.shop_base,
            &[&order.organizer, &order.event, "order", &order.code, &order.secret],
        );
        if order.is_paid() {
            url.set_query(Some("paid=yes"));
        }
        url.to_string()
    }
}

fn parse_base(name: &str, value: &str) -> AppResult<Url> {
    let url = Url::parse(value)
        .map_err(|e| AppError::configuration(format!("{} is not a valid URL: {}", name, e)))?;
    if url.cannot_be_a_base() {
        return Err(AppError::configuration(format!(
            "{} cannot be used as a base URL",
            name
        )));
    }
    Ok(url)
}

// Segments are percent-encoded individually; the result ends with a slash.
fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments).push("");
    }
    url
}
