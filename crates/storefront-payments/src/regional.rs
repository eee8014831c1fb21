//! Mercado Pago Regional Rail
//!
//! Creates a Checkout Pro preference and returns the hosted page the buyer
//! is redirected to. Amounts stay in major units (reais); installments are
//! allowed up to [`MAX_INSTALLMENTS`].
//!
//! There is no maintained Rust SDK for Mercado Pago, so this talks to the
//! REST API with `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::card::DEFAULT_TIMEOUT;
use crate::rail::PaymentStatus;

/// Installment cap offered on the hosted checkout
pub const MAX_INSTALLMENTS: u32 = 12;

const DEFAULT_BASE_URL: &str = "https://api.mercadopago.com";

/// Request to create a hosted-checkout preference
#[derive(Clone, Debug)]
pub struct PreferenceRequest {
    pub product_id: String,
    pub title: String,

    /// Amount in major units
    pub amount: Decimal,

    /// ISO 4217 code, e.g. "BRL"
    pub currency: String,

    /// Unique per checkout attempt, see [`external_reference`]
    pub external_reference: String,

    pub payer_email: Option<String>,
    pub notification_url: String,
    pub success_url: String,
    pub failure_url: String,
}

/// Result of creating a preference
#[derive(Clone, Debug)]
pub struct Preference {
    pub id: String,

    /// Hosted checkout page
    pub redirect_url: String,
}

/// Regional-rail adapter
#[async_trait]
pub trait RegionalRail: Send + Sync {
    /// Create a hosted-checkout preference.
    ///
    /// Not idempotent: every call creates a new preference.
    async fn create_preference(&self, request: PreferenceRequest) -> Result<Preference>;

    /// Current status of a payment, used when a notification carries no status
    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus>;
}

/// External reference for a checkout attempt: `{product_id}-{unix_millis}`.
///
/// Two attempts on the same product within the same millisecond collide;
/// that is accepted as rare rather than prevented.
pub fn external_reference(product_id: &str, unix_millis: i64) -> String {
    format!("{product_id}-{unix_millis}")
}

/// Map a Mercado Pago payment status onto ours
pub fn map_payment_status(status: &str) -> PaymentStatus {
    match status {
        "approved" => PaymentStatus::Approved,
        "pending" | "in_process" | "in_mediation" | "authorized" => PaymentStatus::Pending,
        "rejected" => PaymentStatus::Failed,
        "cancelled" => PaymentStatus::Cancelled,
        "refunded" | "charged_back" => PaymentStatus::Refunded,
        _ => PaymentStatus::Unknown,
    }
}

/// Mercado Pago payment ids are numeric
pub fn is_payment_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Serialize)]
struct PreferenceBody<'a> {
    items: Vec<PreferenceItem<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payer: Option<Payer<'a>>,
    external_reference: &'a str,
    notification_url: &'a str,
    back_urls: BackUrls<'a>,
    auto_return: &'static str,
    payment_methods: PaymentMethods,
}

#[derive(Debug, Serialize)]
struct PreferenceItem<'a> {
    id: &'a str,
    title: &'a str,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    unit_price: Decimal,
    currency_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Payer<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct BackUrls<'a> {
    success: &'a str,
    pending: &'a str,
    failure: &'a str,
}

#[derive(Debug, Serialize)]
struct PaymentMethods {
    installments: u32,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: Option<String>,
    sandbox_init_point: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    status: String,
}

impl<'a> PreferenceBody<'a> {
    fn from_request(request: &'a PreferenceRequest) -> Self {
        Self {
            items: vec![PreferenceItem {
                id: &request.product_id,
                title: &request.title,
                quantity: 1,
                unit_price: request.amount,
                currency_id: &request.currency,
            }],
            payer: request.payer_email.as_deref().map(|email| Payer { email }),
            external_reference: &request.external_reference,
            notification_url: &request.notification_url,
            // Pending payments land on the success page too
            back_urls: BackUrls {
                success: &request.success_url,
                pending: &request.success_url,
                failure: &request.failure_url,
            },
            auto_return: "approved",
            payment_methods: PaymentMethods {
                installments: MAX_INSTALLMENTS,
            },
        }
    }
}

/// Mercado Pago REST client
pub struct MercadoPagoClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
    timeout: Duration,
}

impl MercadoPagoClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point at a different API host (sandbox proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn transport_error(&self, err: reqwest::Error) -> PaymentError {
        if err.is_timeout() {
            PaymentError::Timeout(self.timeout.as_secs())
        } else {
            err.into()
        }
    }

    async fn error_from(response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        PaymentError::MercadoPago(format!("{status}: {body}"))
    }
}

#[async_trait]
impl RegionalRail for MercadoPagoClient {
    async fn create_preference(&self, request: PreferenceRequest) -> Result<Preference> {
        let body = PreferenceBody::from_request(&request);

        let response = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let created: PreferenceResponse = response.json().await?;
        let redirect_url = created
            .init_point
            .or(created.sandbox_init_point)
            .ok_or_else(|| PaymentError::MercadoPago("No init_point returned".into()))?;

        tracing::debug!(
            preference_id = %created.id,
            external_reference = %request.external_reference,
            "Created Mercado Pago preference"
        );

        Ok(Preference {
            id: created.id,
            redirect_url,
        })
    }

    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus> {
        if !is_payment_id(payment_id) {
            return Err(PaymentError::MercadoPago(format!(
                "invalid payment id {payment_id:?}"
            )));
        }

        let response = self
            .http
            .get(format!("{}/v1/payments/{payment_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let payment: PaymentResponse = response.json().await?;
        Ok(map_payment_status(&payment.status))
    }
}
