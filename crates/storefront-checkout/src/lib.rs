//! # storefront-checkout
//!
//! Checkout orchestration for the creator storefront.
//!
//! A visitor's purchase request goes through validation, a catalog lookup
//! and a per-rail price check before the card or regional payment adapter
//! is called. The result is a tagged [`CheckoutOutcome`] or a
//! [`CheckoutError`] naming the stage that failed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_checkout::{Checkout, CheckoutConfig};
//! use storefront_payments::Rail;
//!
//! let checkout = Checkout::new(catalog, stripe, mercadopago, CheckoutConfig::new(base_url));
//! let outcome = checkout.checkout(Rail::Card, body).await?;
//! ```

pub mod error;
pub mod orchestrator;
pub mod request;

pub use error::{CheckoutError, Result};
pub use orchestrator::{Checkout, CheckoutConfig, CheckoutOutcome, RailSession};
pub use request::CheckoutRequest;
