//! Checkout Error Types
//!
//! Every stage of the checkout pipeline returns one of these, so the
//! failure modes are part of the function signatures instead of being
//! caught at a boundary.

use storefront_catalog::CatalogError;
use storefront_payments::{PaymentError, Rail};
use thiserror::Error;

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Checkout error taxonomy
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Malformed or missing input; detected before any external call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown product (or user)
    #[error("{0} not found")]
    NotFound(String),

    /// Product has no price on the requested rail
    #[error("Product does not support {} payments", .0.currency())]
    UnsupportedCurrency(Rail),

    /// The payment provider rejected or failed the call
    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Stable machine-readable kind, used in logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::UnsupportedCurrency(_) => "unsupported_currency",
            Self::PaymentProvider(_) => "payment_provider",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the caller is at fault
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::UnsupportedCurrency(_)
        )
    }

    /// Message safe to show the client. Provider and internal details stay
    /// in the server logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFound(_) | Self::UnsupportedCurrency(_) => self.to_string(),
            Self::PaymentProvider(_) => "Payment processing failed. Please try again.".into(),
            Self::Internal(_) => "Internal server error".into(),
        }
    }
}

impl From<PaymentError> for CheckoutError {
    fn from(err: PaymentError) -> Self {
        if err.is_provider_error() {
            Self::PaymentProvider(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<CatalogError> for CheckoutError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidUsername(msg) => Self::Validation(format!("Invalid username: {msg}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_currency_message() {
        let err = CheckoutError::UnsupportedCurrency(Rail::Regional);
        assert_eq!(err.user_message(), "Product does not support BRL payments");

        let err = CheckoutError::UnsupportedCurrency(Rail::Card);
        assert_eq!(err.user_message(), "Product does not support USD payments");
    }

    #[test]
    fn test_provider_details_hidden() {
        let err: CheckoutError = PaymentError::Stripe("sk_live_secret rejected".into()).into();
        assert!(matches!(err, CheckoutError::PaymentProvider(_)));
        assert!(!err.user_message().contains("sk_live"));

        let err: CheckoutError = PaymentError::Config("missing key".into()).into();
        assert!(matches!(err, CheckoutError::Internal(_)));
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn test_timeout_is_provider_error() {
        let err: CheckoutError = PaymentError::Timeout(5).into();
        assert_eq!(err.kind(), "payment_provider");
    }
}
