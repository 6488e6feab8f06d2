//! Callback authentication and credential redaction
//!
//! The return URL handed to the gateway carries a tag derived from the order
//! secret. Only someone who knows the order secret can produce it, and it is
//! scoped to one payment.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Tag scope for a payment's return URL: `plugins:<provider>:<payment id>`
pub fn return_tag(provider: &str, payment_id: i64) -> String {
    format!("plugins:{}:{}", provider, payment_id)
}

/// Derives a hex HMAC-SHA256 of `tag` keyed by the order secret.
pub fn tagged_secret(order_secret: &str, tag: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(order_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(tag.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Compares two byte strings without short-circuiting on the first mismatch.
///
/// Inputs of different length compare unequal; only the length is leaked.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Placeholder logged instead of a secret-bearing value.
pub fn redaction_marker(value: &str) -> String {
    format!("<redacted str len={}>", value.len())
}

/// Copies `headers`, replacing every value that contains `secret` with a
/// marker naming the value's type and length.
pub fn redact_headers(headers: &BTreeMap<String, String>, secret: &str) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if !secret.is_empty() && value.contains(secret) {
                redaction_marker(value)
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

/// Replaces every occurrence of `secret` in free text, e.g. an error message
/// about to be persisted.
pub fn redact_text(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, &redaction_marker(secret))
}

/// Masks the authentication tag (the last path segment) of a return URL.
pub fn redact_return_url(url: &str) -> String {
    match url.trim_end_matches('/').rsplit_once('/') {
        Some((head, tag)) if !tag.is_empty() => {
            format!("{}/{}/", head, redaction_marker(tag))
        }
        _ => url.to_string(),
    }
}
