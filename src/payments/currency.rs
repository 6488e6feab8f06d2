//! Minor-unit conversion
//!
//! The gateway takes amounts as integers in the currency's smallest unit.
//! Exponents follow ISO 4217; anything not listed uses 2 decimal places.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::DomainError;

const DEFAULT_PLACES: u32 = 2;

const CURRENCY_PLACES: &[(&str, u32)] = &[
    ("BHD", 3),
    ("BIF", 0),
    ("CLF", 4),
    ("CLP", 0),
    ("DJF", 0),
    ("GNF", 0),
    ("IQD", 3),
    ("ISK", 0),
    ("JOD", 3),
    ("JPY", 0),
    ("KMF", 0),
    ("KRW", 0),
    ("KWD", 3),
    ("LYD", 3),
    ("OMR", 3),
    ("PYG", 0),
    ("RWF", 0),
    ("TND", 3),
    ("UGX", 0),
    ("UYI", 0),
    ("UYW", 4),
    ("VND", 0),
    ("VUV", 0),
    ("XAF", 0),
    ("XOF", 0),
    ("XPF", 0),
];

/// Number of decimal places used by `currency` (case-insensitive).
pub fn currency_places(currency: &str) -> u32 {
    let code = currency.to_ascii_uppercase();
    CURRENCY_PLACES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, places)| *places)
        .unwrap_or(DEFAULT_PLACES)
}

/// Converts `amount` to an integer count of minor units, truncating any
/// precision beyond `places`.
pub fn to_minor_units(amount: Decimal, places: u32) -> Result<i64, DomainError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DomainError::InvalidAmount {
            message: format!("{} is negative", amount),
        });
    }

    let factor = 10_i64
        .checked_pow(places)
        .map(Decimal::from)
        .ok_or_else(|| DomainError::InvalidAmount {
            message: format!("{} decimal places are not supported", places),
        })?;

    amount
        .checked_mul(factor)
        .map(|scaled| scaled.trunc())
        .and_then(|scaled| scaled.to_i64())
        .ok_or_else(|| DomainError::InvalidAmount {
            message: format!("{} does not fit in minor units", amount),
        })
}

/// Converts `amount` in `currency` to minor units.
pub fn amount_to_minor_units(amount: Decimal, currency: &str) -> Result<i64, DomainError> {
    to_minor_units(amount, currency_places(currency))
}
