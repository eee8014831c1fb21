//! Creator storefront HTTP server
//!
//! Axum-based server exposing checkout for both payment rails, the public
//! storefront catalog and the provider webhooks.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_catalog::{Catalog, PostgresCatalog};
use storefront_payments::{MercadoPagoClient, StripeClient};

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(config = ?config, "Loaded configuration");

    // Catalog
    let catalog =
        PostgresCatalog::connect(&config.database_url, config.database_max_connections).await?;
    if catalog.health_check().await {
        tracing::info!(backend = catalog.name(), "✓ Catalog reachable");
    } else {
        tracing::warn!("⚠ Catalog database not responding");
    }

    // Payment rails
    let provider_timeout = Duration::from_secs(config.provider_timeout_secs);
    let stripe = StripeClient::new(&config.stripe_secret_key).with_timeout(provider_timeout);
    let mut mercadopago = MercadoPagoClient::new(&config.mercadopago_access_token)
        .with_timeout(provider_timeout);
    if let Some(url) = &config.mercadopago_api_url {
        mercadopago = mercadopago.with_base_url(url);
    }

    let state = AppState::new(
        &config,
        Arc::new(catalog),
        Arc::new(stripe),
        Arc::new(mercadopago),
    );
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("🚀 Storefront server running on http://{}", config.bind_addr);
    tracing::info!("   Public base URL: {}", config.public_base_url);
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                 - Health check");
    tracing::info!("  POST /payments/create-intent - Card checkout (Stripe)");
    tracing::info!("  POST /payments/regional      - Regional checkout (Mercado Pago)");
    tracing::info!("  GET  /public/{{username}}      - Creator storefront");
    tracing::info!("  POST /webhooks/stripe        - Stripe webhooks");
    tracing::info!("  POST /webhooks/mercadopago   - Mercado Pago webhooks");

    axum::serve(listener, app).await?;

    Ok(())
}
