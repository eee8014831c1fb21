//! # storefront-payments
//!
//! Payment adapters and webhook processing for the creator storefront.
//!
//! ## Rails
//!
//! Two providers with incompatible models sit behind two small traits:
//!
//! ```text
//!                 ┌───────────────────────────┐
//!                 │   Checkout Orchestrator   │
//!                 └─────────────┬─────────────┘
//!               ┌───────────────┴───────────────┐
//!      ┌────────▼────────┐             ┌────────▼────────┐
//!      │    CardRail     │             │  RegionalRail   │
//!      │ (StripeClient)  │             │ (MercadoPago)   │
//!      │ USD, cents      │             │ BRL, reais      │
//!      │ → client secret │             │ → redirect URL  │
//!      └─────────────────┘             └─────────────────┘
//! ```
//!
//! ### Card rail (Stripe Elements)
//!
//! **Flow:** server creates a PaymentIntent → browser confirms it with the
//! client secret → Stripe calls `/webhooks/stripe`.
//!
//! ### Regional rail (Mercado Pago Checkout Pro)
//!
//! **Flow:** server creates a preference → buyer is redirected to the hosted
//! page, may pay in up to 12 installments → Mercado Pago calls
//! `/webhooks/mercadopago` and redirects the buyer back.
//!
//! Neither adapter sends an idempotency key, so a client retry after a
//! timeout can create a second session or preference.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_payments::{CardRail, CardSessionRequest, StripeClient};
//!
//! let stripe = StripeClient::new("sk_test_xxx");
//! let session = stripe.create_session(CardSessionRequest {
//!     amount: dec!(19.99),
//!     currency: "USD".into(),
//!     metadata: HashMap::new(),
//! }).await?;
//!
//! assert_eq!(session.amount_minor, 1999);
//! // Hand session.client_secret to Stripe Elements
//! ```

mod card;
mod error;
mod money;
mod orders;
mod rail;
mod regional;
mod webhook;

pub use card::{CardRail, CardSession, CardSessionRequest, DEFAULT_TIMEOUT, StripeClient};
pub use error::{PaymentError, Result};
pub use money::to_minor_units;
pub use orders::{
    MAX_TRACKED_EVENTS, MemoryOrderStore, OrderRecord, OrderStore, OrderTransition,
    TransitionOutcome,
};
pub use rail::{PaymentStatus, Rail};
pub use regional::{
    MAX_INSTALLMENTS, MercadoPagoClient, Preference, PreferenceRequest, RegionalRail,
    external_reference, map_payment_status,
};
pub use webhook::{
    DEFAULT_TOLERANCE_SECS, SignatureHeader, WebhookEvent, WebhookHandler, WebhookOutcome,
    WebhookVerifier,
};
