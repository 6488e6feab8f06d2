//! Payment provider implementations
//!
//! Concrete implementations of the PaymentProvider trait.

pub mod revolut;

pub use revolut::RevolutProvider;
