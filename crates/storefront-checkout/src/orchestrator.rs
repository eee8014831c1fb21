//! Checkout Orchestrator
//!
//! One linear pipeline per call:
//!
//! ```text
//! validate ──▶ catalog lookup ──▶ rail price check ──▶ provider session
//!    │               │                   │                    │
//!    ▼               ▼                   ▼                    ▼
//! Validation      NotFound      UnsupportedCurrency   PaymentProvider
//! ```
//!
//! Each stage gates the next; no provider is called until the product
//! exists and has a price on the requested rail. Nothing is shared between
//! calls except the read-only catalog and provider clients.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use storefront_catalog::{Catalog, Product};
use storefront_payments::{
    CardRail, CardSessionRequest, PreferenceRequest, Rail, RegionalRail, external_reference,
};

use crate::error::{CheckoutError, Result};
use crate::request::CheckoutRequest;

/// Where providers send buyers and notifications back to
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    /// Public origin of the storefront, e.g. `https://shop.example.com`
    pub public_base_url: String,
}

impl CheckoutConfig {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn notification_url(&self) -> String {
        format!("{}/webhooks/mercadopago", self.public_base_url)
    }

    pub fn success_url(&self, product_id: &str) -> String {
        format!("{}/checkout/success?product={product_id}", self.public_base_url)
    }

    pub fn failure_url(&self, product_id: &str) -> String {
        format!("{}/checkout/failure?product={product_id}", self.public_base_url)
    }
}

/// Rail-specific artifact the client needs to finish paying
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RailSession {
    Card {
        intent_id: String,
        client_secret: String,

        /// Cents actually charged
        amount_minor: i64,
    },
    Regional {
        preference_id: String,
        redirect_url: String,
    },
}

/// Result of a successful checkout call
#[derive(Clone, Debug)]
pub struct CheckoutOutcome {
    /// Amount charged, in the rail's major units. For the card rail this is
    /// the rounded cent amount sent to Stripe, not the raw catalog price.
    pub amount: Decimal,
    pub product_title: String,
    pub session: RailSession,
}

/// The checkout pipeline
pub struct Checkout {
    catalog: Arc<dyn Catalog>,
    card: Arc<dyn CardRail>,
    regional: Arc<dyn RegionalRail>,
    config: CheckoutConfig,
}

const fn price_for(product: &Product, rail: Rail) -> Option<Decimal> {
    match rail {
        Rail::Card => product.price_usd,
        Rail::Regional => product.price_brl,
    }
}

impl Checkout {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        card: Arc<dyn CardRail>,
        regional: Arc<dyn RegionalRail>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            catalog,
            card,
            regional,
            config,
        }
    }

    /// Run a checkout from a raw request body
    pub async fn checkout(&self, rail: Rail, raw: &[u8]) -> Result<CheckoutOutcome> {
        let result = match CheckoutRequest::parse(raw) {
            Ok(request) => self.checkout_request(rail, &request).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => tracing::info!(
                rail = %rail,
                amount = %outcome.amount,
                "Checkout session created"
            ),
            Err(e) if e.is_client_error() => tracing::warn!(
                rail = %rail,
                kind = e.kind(),
                error = %e,
                "Checkout rejected"
            ),
            Err(e) => tracing::error!(
                rail = %rail,
                kind = e.kind(),
                error = %e,
                "Checkout failed"
            ),
        }

        result
    }

    /// Run a checkout for an already validated request
    pub async fn checkout_request(
        &self,
        rail: Rail,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome> {
        let product = self
            .catalog
            .find_product(&request.product_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound("Product".into()))?;

        let amount =
            price_for(&product, rail).ok_or(CheckoutError::UnsupportedCurrency(rail))?;

        tracing::debug!(product_id = %product.id, rail = %rail, %amount, "Resolved product price");

        let session = match rail {
            Rail::Card => self.open_card_session(&product, amount, request).await?,
            Rail::Regional => self.open_preference(&product, amount, request).await?,
        };

        let amount = match &session {
            RailSession::Card { amount_minor, .. } => Decimal::new(*amount_minor, 2),
            RailSession::Regional { .. } => amount,
        };

        Ok(CheckoutOutcome {
            amount,
            product_title: product.title,
            session,
        })
    }

    async fn open_card_session(
        &self,
        product: &Product,
        amount: Decimal,
        request: &CheckoutRequest,
    ) -> Result<RailSession> {
        let mut metadata = HashMap::from([
            ("product_id".to_string(), product.id.clone()),
            ("buyer_email".to_string(), request.buyer_email.clone()),
            ("user_id".to_string(), product.owner_id.clone()),
            ("product_title".to_string(), product.title.clone()),
        ]);
        if let Some(name) = &request.buyer_name {
            metadata.insert("buyer_name".to_string(), name.clone());
        }

        let session = self
            .card
            .create_session(CardSessionRequest {
                amount,
                currency: Rail::Card.currency().to_string(),
                metadata,
            })
            .await?;

        Ok(RailSession::Card {
            intent_id: session.intent_id,
            client_secret: session.client_secret,
            amount_minor: session.amount_minor,
        })
    }

    async fn open_preference(
        &self,
        product: &Product,
        amount: Decimal,
        request: &CheckoutRequest,
    ) -> Result<RailSession> {
        let reference = external_reference(&product.id, chrono::Utc::now().timestamp_millis());

        let preference = self
            .regional
            .create_preference(PreferenceRequest {
                product_id: product.id.clone(),
                title: product.title.clone(),
                amount,
                currency: Rail::Regional.currency().to_string(),
                external_reference: reference,
                payer_email: Some(request.buyer_email.clone()),
                notification_url: self.config.notification_url(),
                success_url: self.config.success_url(&product.id),
                failure_url: self.config.failure_url(&product.id),
            })
            .await?;

        Ok(RailSession::Regional {
            preference_id: preference.id,
            redirect_url: preference.redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storefront_catalog::{CatalogError, Creator, MemoryCatalog, Storefront};
    use storefront_payments::{
        CardSession, PaymentError, PaymentStatus, Preference, to_minor_units,
    };

    #[derive(Default)]
    struct StubCard {
        calls: AtomicUsize,
        last: Mutex<Option<CardSessionRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl CardRail for StubCard {
        async fn create_session(
            &self,
            request: CardSessionRequest,
        ) -> storefront_payments::Result<CardSession> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PaymentError::Stripe("card_declined: secret detail".into()));
            }
            let amount_minor = to_minor_units(request.amount)?;
            *self.last.lock().unwrap() = Some(request);
            Ok(CardSession {
                intent_id: "pi_123".into(),
                client_secret: "pi_123_secret_abc".into(),
                amount_minor,
            })
        }
    }

    #[derive(Default)]
    struct StubRegional {
        calls: AtomicUsize,
        last: Mutex<Option<PreferenceRequest>>,
    }

    #[async_trait]
    impl RegionalRail for StubRegional {
        async fn create_preference(
            &self,
            request: PreferenceRequest,
        ) -> storefront_payments::Result<Preference> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request);
            Ok(Preference {
                id: "pref_1".into(),
                redirect_url: "https://mp.test/checkout?pref_id=pref_1".into(),
            })
        }

        async fn payment_status(&self, _payment_id: &str) -> storefront_payments::Result<PaymentStatus> {
            Ok(PaymentStatus::Pending)
        }
    }

    struct BrokenCatalog;

    #[async_trait]
    impl Catalog for BrokenCatalog {
        async fn find_product(&self, _id: &str) -> storefront_catalog::Result<Option<Product>> {
            Err(CatalogError::Config("connection refused".into()))
        }

        async fn find_creator(&self, _username: &str) -> storefront_catalog::Result<Option<Creator>> {
            Ok(None)
        }

        async fn products_by_owner(&self, _owner: &str) -> storefront_catalog::Result<Vec<Product>> {
            Ok(Vec::new())
        }

        async fn storefront(&self, _username: &str) -> storefront_catalog::Result<Option<Storefront>> {
            Ok(None)
        }

        async fn health_check(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    struct Fixture {
        checkout: Checkout,
        card: Arc<StubCard>,
        regional: Arc<StubRegional>,
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_product(Product::new("p1", "u1", "p1's title").with_price_usd(dec!(9.99)))
            .with_product(
                Product::new("p2", "u1", "Font bundle")
                    .with_price_usd(dec!(19.99))
                    .with_price_brl(dec!(99.90)),
            )
            .with_product(Product::new("p3", "u1", "BRL only").with_price_brl(dec!(25)))
            .with_product(Product::new("p4", "u1", "Odd price").with_price_usd(dec!(9.995)))
    }

    fn fixture_with(catalog: Arc<dyn Catalog>, card: StubCard) -> Fixture {
        let card = Arc::new(card);
        let regional = Arc::new(StubRegional::default());
        let checkout = Checkout::new(
            catalog,
            card.clone(),
            regional.clone(),
            CheckoutConfig::new("https://shop.test/"),
        );
        Fixture {
            checkout,
            card,
            regional,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(catalog()), StubCard::default())
    }

    impl Fixture {
        fn external_calls(&self) -> usize {
            self.card.calls.load(Ordering::SeqCst) + self.regional.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_invalid_email_makes_no_external_calls() {
        let f = fixture();

        for body in [
            r#"{"productId":"p1","buyerEmail":"nope"}"#,
            r#"{"productId":"p1","buyerEmail":""}"#,
            r#"{"productId":"p1"}"#,
        ] {
            for rail in [Rail::Card, Rail::Regional] {
                let err = f.checkout.checkout(rail, body.as_bytes()).await.unwrap_err();
                assert!(matches!(err, CheckoutError::Validation(_)), "{body}");
            }
        }

        assert_eq!(f.external_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let f = fixture();
        let body = br#"{"productId":"missing","buyerEmail":"a@b.com"}"#;

        let err = f.checkout.checkout(Rail::Card, body).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound(_)));
        assert_eq!(err.user_message(), "Product not found");

        let err = f.checkout.checkout(Rail::Regional, body).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound(_)));

        assert_eq!(f.external_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_usd_price_never_calls_card_rail() {
        let f = fixture();
        let body = br#"{"productId":"p3","buyerEmail":"a@b.com"}"#;

        let err = f.checkout.checkout(Rail::Card, body).await.unwrap_err();
        assert!(matches!(err, CheckoutError::UnsupportedCurrency(Rail::Card)));
        assert_eq!(f.card.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_card_checkout() {
        let f = fixture();
        let body = br#"{"productId":"p1","buyerEmail":"a@b.com"}"#;

        let outcome = f.checkout.checkout(Rail::Card, body).await.unwrap();
        assert_eq!(outcome.amount, dec!(9.99));
        assert_eq!(outcome.product_title, "p1's title");
        assert_eq!(
            outcome.session,
            RailSession::Card {
                intent_id: "pi_123".into(),
                client_secret: "pi_123_secret_abc".into(),
                amount_minor: 999,
            }
        );

        let sent = f.card.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.amount, dec!(9.99));
        assert_eq!(sent.currency, "USD");
        assert_eq!(sent.metadata["product_id"], "p1");
        assert_eq!(sent.metadata["buyer_email"], "a@b.com");
        assert_eq!(sent.metadata["user_id"], "u1");
        assert_eq!(sent.metadata["product_title"], "p1's title");
        assert!(!sent.metadata.contains_key("buyer_name"));
        assert_eq!(f.regional.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_card_amount_is_what_stripe_charges() {
        let f = fixture();
        let body = br#"{"productId":"p4","buyerEmail":"a@b.com"}"#;

        let outcome = f.checkout.checkout(Rail::Card, body).await.unwrap();

        // 999.5 cents rounds half-to-even to 1000
        assert_eq!(outcome.amount, dec!(10.00));
        assert!(matches!(
            outcome.session,
            RailSession::Card { amount_minor: 1000, .. }
        ));
    }

    #[tokio::test]
    async fn test_card_checkout_carries_buyer_name() {
        let f = fixture();
        let body = br#"{"productId":"p2","buyerEmail":"a@b.com","buyerName":"Ana"}"#;

        f.checkout.checkout(Rail::Card, body).await.unwrap();

        let sent = f.card.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.metadata["buyer_name"], "Ana");
        assert_eq!(to_minor_units(sent.amount).unwrap(), 1999);
    }

    #[tokio::test]
    async fn test_regional_checkout_without_brl_price() {
        let f = fixture();
        let body = br#"{"productId":"p1","buyerEmail":"a@b.com"}"#;

        let err = f.checkout.checkout(Rail::Regional, body).await.unwrap_err();
        assert_eq!(err.user_message(), "Product does not support BRL payments");
        assert_eq!(f.external_calls(), 0);
    }

    #[tokio::test]
    async fn test_regional_checkout() {
        let f = fixture();
        let body = br#"{"productId":"p2","buyerEmail":"a@b.com"}"#;

        let outcome = f.checkout.checkout(Rail::Regional, body).await.unwrap();
        assert_eq!(outcome.amount, dec!(99.90));
        assert_eq!(outcome.product_title, "Font bundle");
        assert!(matches!(
            outcome.session,
            RailSession::Regional { ref preference_id, .. } if preference_id == "pref_1"
        ));

        let sent = f.regional.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.currency, "BRL");
        assert_eq!(sent.payer_email.as_deref(), Some("a@b.com"));
        assert_eq!(sent.notification_url, "https://shop.test/webhooks/mercadopago");
        assert_eq!(sent.success_url, "https://shop.test/checkout/success?product=p2");
        assert_eq!(sent.failure_url, "https://shop.test/checkout/failure?product=p2");

        let (product, millis) = sent.external_reference.rsplit_once('-').unwrap();
        assert_eq!(product, "p2");
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(f.card.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_leaked() {
        let f = fixture_with(
            Arc::new(catalog()),
            StubCard {
                fail: true,
                ..StubCard::default()
            },
        );
        let body = br#"{"productId":"p1","buyerEmail":"a@b.com"}"#;

        let err = f.checkout.checkout(Rail::Card, body).await.unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentProvider(_)));
        assert!(!err.user_message().contains("secret detail"));
        assert_eq!(f.card.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_catalog_failure_is_internal() {
        let f = fixture_with(Arc::new(BrokenCatalog), StubCard::default());
        let body = br#"{"productId":"p1","buyerEmail":"a@b.com"}"#;

        let err = f.checkout.checkout(Rail::Card, body).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Internal(_)));
        assert_eq!(err.user_message(), "Internal server error");
        assert_eq!(f.external_calls(), 0);
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = CheckoutConfig::new("https://shop.test///");
        assert_eq!(config.notification_url(), "https://shop.test/webhooks/mercadopago");
    }
}
