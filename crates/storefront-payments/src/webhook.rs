//! Webhook Verification and Handling
//!
//! Nothing in a payload is trusted until its signature checks out, and the
//! check always runs on the bytes exactly as received.
//!
//! | Rail     | Header             | Format                       | Verified by                        |
//! |----------|--------------------|------------------------------|------------------------------------|
//! | Card     | `Stripe-Signature` | `t=<unix>,v1=<hex>`          | `stripe::Webhook::construct_event` |
//! | Regional | `x-signature`      | `ts=<unix>,v1=<hex>[,v1=..]` | HMAC-SHA256 over `"{ts}.{body}"`   |

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use stripe::{Event, EventObject, EventType, Webhook, WebhookError};

use crate::error::{PaymentError, Result};
use crate::orders::{OrderStore, OrderTransition, TransitionOutcome};
use crate::rail::{PaymentStatus, Rail};
use crate::regional::{RegionalRail, is_payment_id};

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age of a signed regional event
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

/// Clock skew allowed for timestamps from the future
const MAX_FUTURE_SKEW_SECS: i64 = 60;

/// A parsed `x-signature` header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };

            if key == "ts" {
                timestamp = value.parse::<i64>().ok();
            } else if key == "v1" {
                // Malformed entries are skipped; another v1 may still match
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| PaymentError::WebhookSignature("missing timestamp".into()))?;
        if signatures.is_empty() {
            return Err(PaymentError::WebhookSignature("missing v1 signature".into()));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// A verified provider notification
#[derive(Clone, Debug)]
pub struct WebhookEvent {
    pub rail: Rail,
    pub event_id: String,
    pub event_type: String,

    /// PaymentIntent id (card) or payment id (regional)
    pub transaction_id: String,

    pub status: PaymentStatus,
    pub metadata: HashMap<String, String>,
}

/// Verifies signed webhook payloads for one rail
pub struct WebhookVerifier {
    rail: Rail,
    secret: String,
    tolerance_secs: u64,
}

impl WebhookVerifier {
    pub fn new(rail: Rail, secret: impl Into<String>) -> Self {
        Self {
            rail,
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Maximum event age for the regional rail. Stripe enforces its own
    /// five-minute window inside `construct_event`.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance_secs: u64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    pub const fn rail(&self) -> Rail {
        self.rail
    }

    /// Header the provider puts the signature in
    pub const fn header_name(&self) -> &'static str {
        match self.rail {
            Rail::Card => "stripe-signature",
            Rail::Regional => "x-signature",
        }
    }

    /// Verify against the current time and parse the event
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<WebhookEvent> {
        match self.rail {
            Rail::Card => self.verify_stripe(payload, header),
            Rail::Regional => {
                self.verify_regional_at(payload, header, chrono::Utc::now().timestamp())
            }
        }
    }

    fn verify_stripe(&self, payload: &[u8], header: &str) -> Result<WebhookEvent> {
        let payload = std::str::from_utf8(payload)
            .map_err(|_| PaymentError::WebhookSignature("payload is not UTF-8".into()))?;

        let event = Webhook::construct_event(payload, header, &self.secret).map_err(|e| match e {
            WebhookError::BadParse(e) => PaymentError::WebhookParse(e.to_string()),
            other => PaymentError::WebhookSignature(other.to_string()),
        })?;

        Ok(stripe_event(event))
    }

    /// Regional verification against an explicit clock (unix seconds)
    fn verify_regional_at(&self, payload: &[u8], header: &str, now: i64) -> Result<WebhookEvent> {
        let header = SignatureHeader::parse(header)?;

        let age = now.saturating_sub(header.timestamp);
        if age > i64::try_from(self.tolerance_secs).unwrap_or(i64::MAX) {
            return Err(PaymentError::WebhookSignature(format!(
                "event too old ({age} seconds)"
            )));
        }
        if age < -MAX_FUTURE_SKEW_SECS {
            return Err(PaymentError::WebhookSignature(
                "event timestamp in future".into(),
            ));
        }

        let mac = self.mac_for(payload, header.timestamp)?;
        let matched = header
            .signatures
            .iter()
            .any(|candidate| mac.clone().verify_slice(candidate).is_ok());

        if !matched {
            return Err(PaymentError::WebhookSignature("signature mismatch".into()));
        }

        parse_regional_event(payload)
    }

    /// Signature header value for `payload`, as the provider would send it
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let signature = hex::encode(self.mac_for(payload, timestamp)?.finalize().into_bytes());

        Ok(match self.rail {
            Rail::Card => format!("t={timestamp},v1={signature}"),
            Rail::Regional => format!("ts={timestamp},v1={signature}"),
        })
    }

    fn mac_for(&self, payload: &[u8], timestamp: i64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| PaymentError::Config(e.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

const fn stripe_status(event_type: &EventType) -> PaymentStatus {
    match event_type {
        EventType::PaymentIntentSucceeded => PaymentStatus::Approved,
        EventType::PaymentIntentProcessing => PaymentStatus::Pending,
        EventType::PaymentIntentPaymentFailed => PaymentStatus::Failed,
        EventType::PaymentIntentCanceled => PaymentStatus::Cancelled,
        EventType::ChargeRefunded => PaymentStatus::Refunded,
        _ => PaymentStatus::Unknown,
    }
}

fn stripe_event(event: Event) -> WebhookEvent {
    let (transaction_id, metadata) = match event.data.object {
        EventObject::PaymentIntent(intent) => (intent.id.to_string(), intent.metadata),
        EventObject::Charge(charge) => {
            // Charges point back at their PaymentIntent
            let transaction_id = charge
                .payment_intent
                .as_ref()
                .map_or_else(|| charge.id.to_string(), |intent| intent.id().to_string());
            (transaction_id, charge.metadata)
        }
        _ => (String::new(), HashMap::new()),
    };

    let status = if transaction_id.is_empty() {
        PaymentStatus::Unknown
    } else {
        stripe_status(&event.type_)
    };

    WebhookEvent {
        rail: Rail::Card,
        event_id: event.id.to_string(),
        event_type: format!("{:?}", event.type_),
        transaction_id,
        status,
        metadata,
    }
}

#[derive(Debug, Deserialize)]
struct MercadoPagoEnvelope {
    #[serde(default)]
    id: Option<Value>,
    #[serde(rename = "type", default)]
    event_type: Option<String>,
    #[serde(default)]
    action: Option<String>,
    data: MercadoPagoData,
}

#[derive(Debug, Deserialize)]
struct MercadoPagoData {
    id: Value,
}

/// Mercado Pago sends ids as numbers or strings depending on the topic
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_regional_event(payload: &[u8]) -> Result<WebhookEvent> {
    let envelope: MercadoPagoEnvelope = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

    let transaction_id = id_string(&envelope.data.id)
        .ok_or_else(|| PaymentError::WebhookParse("missing data.id".into()))?;
    if !is_payment_id(&transaction_id) {
        return Err(PaymentError::WebhookParse(format!(
            "data.id {transaction_id:?} is not a payment id"
        )));
    }

    let event_type = envelope
        .action
        .or(envelope.event_type)
        .unwrap_or_else(|| "payment".into());
    let event_id = envelope
        .id
        .as_ref()
        .and_then(id_string)
        .unwrap_or_else(|| format!("{event_type}:{transaction_id}"));

    let status = if event_type == "payment.created" {
        PaymentStatus::Pending
    } else {
        PaymentStatus::Unknown
    };

    Ok(WebhookEvent {
        rail: Rail::Regional,
        event_id,
        event_type,
        transaction_id,
        status,
        metadata: HashMap::new(),
    })
}

/// What the handler did with a verified event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    Recorded(TransitionOutcome),

    /// Event carries no status we act on
    Ignored,
}

/// Webhook handler
pub struct WebhookHandler<S: OrderStore> {
    order_store: Arc<S>,
    regional: Option<Arc<dyn RegionalRail>>,
}

impl<S: OrderStore> WebhookHandler<S> {
    pub const fn new(order_store: Arc<S>) -> Self {
        Self {
            order_store,
            regional: None,
        }
    }

    /// Resolve regional statuses the notification does not carry
    #[must_use]
    pub fn with_regional(mut self, regional: Arc<dyn RegionalRail>) -> Self {
        self.regional = Some(regional);
        self
    }

    pub const fn order_store(&self) -> &Arc<S> {
        &self.order_store
    }

    /// Process a verified webhook event
    pub async fn handle(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        tracing::info!(
            rail = %event.rail,
            event_id = %event.event_id,
            event_type = %event.event_type,
            "Processing payment webhook"
        );

        let status = self.resolve_status(&event).await?;
        if status == PaymentStatus::Unknown {
            tracing::debug!(event_type = %event.event_type, "Unhandled webhook event");
            return Ok(WebhookOutcome::Ignored);
        }

        // A looked-up status belongs to the notification's identity: the same
        // notification may be redelivered after the payment has moved on
        let event_id = if status == event.status {
            event.event_id
        } else {
            format!("{}:{status}", event.event_id)
        };

        let transition = OrderTransition {
            rail: event.rail,
            transaction_id: event.transaction_id,
            status,
            event_id,
            metadata: event.metadata,
        };

        let outcome = self.order_store.apply(&transition)?;
        match outcome {
            TransitionOutcome::Applied(status) => tracing::info!(
                transaction_id = %transition.transaction_id,
                status = %status,
                "Order transitioned"
            ),
            TransitionOutcome::Duplicate => tracing::info!(
                event_id = %transition.event_id,
                "Webhook event already processed"
            ),
            TransitionOutcome::Stale { current, requested } => tracing::warn!(
                transaction_id = %transition.transaction_id,
                current = %current,
                requested = %requested,
                "Ignoring out-of-order status"
            ),
        }

        Ok(WebhookOutcome::Recorded(outcome))
    }

    async fn resolve_status(&self, event: &WebhookEvent) -> Result<PaymentStatus> {
        if event.status != PaymentStatus::Unknown
            || event.rail != Rail::Regional
            || !event.event_type.starts_with("payment")
        {
            return Ok(event.status);
        }

        match &self.regional {
            Some(regional) => regional.payment_status(&event.transaction_id).await,
            None => Ok(PaymentStatus::Unknown),
        }
    }
}
