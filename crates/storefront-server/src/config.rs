//! Server Configuration
//!
//! Read once at startup. Every provider secret is required; a missing one
//! stops the process before it binds a socket.

use thiserror::Error;

use storefront_payments::{DEFAULT_TIMEOUT, DEFAULT_TOLERANCE_SECS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Process-wide configuration
#[derive(Clone)]
pub struct AppConfig {
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub mercadopago_access_token: String,
    pub mercadopago_webhook_secret: String,

    /// Origin used for provider callback and redirect URLs
    pub public_base_url: String,

    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    /// Maximum age of a signed Mercado Pago notification
    pub webhook_tolerance_secs: u64,

    /// Per-call deadline for both payment providers
    pub provider_timeout_secs: u64,

    /// Overrides the Mercado Pago API host
    pub mercadopago_api_url: Option<String>,
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let public_base_url = required("PUBLIC_BASE_URL")?;
        if !public_base_url.starts_with("http://") && !public_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "PUBLIC_BASE_URL",
                reason: "must start with http:// or https://".into(),
            });
        }

        Ok(Self {
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            mercadopago_access_token: required("MERCADOPAGO_ACCESS_TOKEN")?,
            mercadopago_webhook_secret: required("MERCADOPAGO_WEBHOOK_SECRET")?,
            public_base_url,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            webhook_tolerance_secs: parse_or(&lookup, "WEBHOOK_TOLERANCE_SECS", DEFAULT_TOLERANCE_SECS)?,
            provider_timeout_secs: parse_or(&lookup, "PROVIDER_TIMEOUT_SECS", DEFAULT_TIMEOUT.as_secs())?,
            mercadopago_api_url: lookup("MERCADOPAGO_API_URL").filter(|v| !v.trim().is_empty()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

// Secrets never reach the logs
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("public_base_url", &self.public_base_url)
            .field("database_max_connections", &self.database_max_connections)
            .field("bind_addr", &self.bind_addr)
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("mercadopago_api_url", &self.mercadopago_api_url)
            .finish_non_exhaustive()
    }
}
