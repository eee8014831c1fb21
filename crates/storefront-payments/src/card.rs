//! Stripe Card Rail
//!
//! Creates a PaymentIntent and hands its client secret back to the browser,
//! where Stripe Elements confirms the payment. Amounts go to Stripe in cents.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use stripe::{
    Client, CreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods, Currency,
    PaymentIntent,
};

use crate::error::{PaymentError, Result};
use crate::money::to_minor_units;

/// Session creation is a single hosted call; anything slower is treated as a failure
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Request to open a card payment session
#[derive(Clone, Debug)]
pub struct CardSessionRequest {
    /// Amount in major units (dollars)
    pub amount: Decimal,

    /// ISO 4217 code, e.g. "USD"
    pub currency: String,

    /// Copied verbatim onto the PaymentIntent for reconciliation
    pub metadata: HashMap<String, String>,
}

/// Result of creating a card payment session
#[derive(Clone, Debug)]
pub struct CardSession {
    /// PaymentIntent id
    pub intent_id: String,

    /// Token the browser uses to confirm the payment
    pub client_secret: String,

    /// Amount sent to Stripe, in cents
    pub amount_minor: i64,
}

/// Card-rail adapter
#[async_trait]
pub trait CardRail: Send + Sync {
    /// Create a provider-side payment session.
    ///
    /// Not idempotent: every call creates a new PaymentIntent.
    async fn create_session(&self, request: CardSessionRequest) -> Result<CardSession>;
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    timeout: Duration,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_currency(code: &str) -> Result<Currency> {
    code.to_ascii_lowercase()
        .parse::<Currency>()
        .map_err(|_| PaymentError::UnsupportedCurrency(code.to_string()))
}

#[async_trait]
impl CardRail for StripeClient {
    async fn create_session(&self, request: CardSessionRequest) -> Result<CardSession> {
        let amount_minor = to_minor_units(request.amount)?;
        let currency = parse_currency(&request.currency)?;

        let mut params = CreatePaymentIntent::new(amount_minor, currency);
        // Let Stripe decide which payment methods to offer
        params.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
            enabled: true,
            allow_redirects: None,
        });
        params.metadata = Some(request.metadata);

        let intent = tokio::time::timeout(self.timeout, PaymentIntent::create(&self.client, params))
            .await
            .map_err(|_| PaymentError::Timeout(self.timeout.as_secs()))??;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::Stripe("No client secret returned".into()))?;

        tracing::debug!(intent_id = %intent.id, amount_minor, "Created Stripe PaymentIntent");

        Ok(CardSession {
            intent_id: intent.id.to_string(),
            client_secret,
            amount_minor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("USD").unwrap(), Currency::USD);
        assert_eq!(parse_currency("usd").unwrap(), Currency::USD);
        assert!(matches!(
            parse_currency("NOPE"),
            Err(PaymentError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn test_client_timeout() {
        let client = StripeClient::new("sk_test_123");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = client.with_timeout(Duration::from_secs(2));
        assert_eq!(client.timeout, Duration::from_secs(2));
    }
}
