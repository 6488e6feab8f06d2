//! Revolut hosted-checkout provider for a ticketing platform
//!
//! Creates gateway orders for local payments, redirects buyers to the hosted
//! checkout page and settles payments when they come back.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod payments;
pub mod telemetry;
