//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Mercado Pago API error
    #[error("Mercado Pago error: {0}")]
    MercadoPago(String),

    /// Provider did not answer in time
    #[error("Payment provider timed out after {0}s")]
    Timeout(u64),

    /// Currency not accepted by the rail
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Amount cannot be charged (negative, too large, ...)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    /// Errors raised by the remote provider (or the trip to it)
    pub const fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::Stripe(_) | Self::MercadoPago(_) | Self::Timeout(_)
        )
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Stripe(_) | Self::MercadoPago(_) | Self::Timeout(_) => {
                "Payment processing failed. Please try again."
            }
            Self::UnsupportedCurrency(_) => "This currency is not supported.",
            Self::WebhookSignature(_) => "Invalid signature",
            Self::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        Self::MercadoPago(err.to_string())
    }
}

impl From<stripe::StripeError> for PaymentError {
    fn from(err: stripe::StripeError) -> Self {
        Self::Stripe(err.to_string())
    }
}
