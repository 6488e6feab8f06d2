//! Revolut hosted-checkout integration
//!
//! Checkout initiation creates a gateway order and hands back the hosted
//! checkout URL; the return handler verifies the buyer's return and applies
//! the gateway's order state to the local payment.

pub mod client;
pub mod currency;
pub mod providers;
pub mod return_handler;
pub mod security;
pub mod traits;
pub mod types;
pub mod urls;
