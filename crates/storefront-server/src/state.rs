//! Application State

use std::sync::Arc;

use storefront_catalog::Catalog;
use storefront_checkout::{Checkout, CheckoutConfig};
use storefront_payments::{
    CardRail, MemoryOrderStore, Rail, RegionalRail, WebhookHandler, WebhookVerifier,
};

use crate::config::AppConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Read-only product catalog
    pub catalog: Arc<dyn Catalog>,

    /// Checkout pipeline for both rails
    pub checkout: Arc<Checkout>,

    pub stripe_webhooks: Arc<WebhookVerifier>,
    pub mercadopago_webhooks: Arc<WebhookVerifier>,

    /// Applies verified webhook events to orders
    pub webhook_handler: Arc<WebhookHandler<MemoryOrderStore>>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        catalog: Arc<dyn Catalog>,
        card: Arc<dyn CardRail>,
        regional: Arc<dyn RegionalRail>,
    ) -> Self {
        let order_store = Arc::new(MemoryOrderStore::new());

        let checkout = Checkout::new(
            catalog.clone(),
            card,
            regional.clone(),
            CheckoutConfig::new(&config.public_base_url),
        );

        let stripe_webhooks = WebhookVerifier::new(Rail::Card, &config.stripe_webhook_secret);
        let mercadopago_webhooks =
            WebhookVerifier::new(Rail::Regional, &config.mercadopago_webhook_secret)
                .with_tolerance(config.webhook_tolerance_secs);

        Self {
            catalog,
            checkout: Arc::new(checkout),
            stripe_webhooks: Arc::new(stripe_webhooks),
            mercadopago_webhooks: Arc::new(mercadopago_webhooks),
            webhook_handler: Arc::new(WebhookHandler::new(order_store).with_regional(regional)),
        }
    }
}
