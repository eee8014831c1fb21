//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use rust_decimal::Decimal;
use serde::Serialize;

use storefront_catalog::Storefront;
use storefront_checkout::{CheckoutError, RailSession};
use storefront_payments::{PaymentError, Rail, WebhookVerifier};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub catalog: bool,
}

/// Error envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCheckoutResponse {
    pub client_secret: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub product_title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalCheckoutResponse {
    pub preference_id: String,
    pub init_point: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub product_title: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn checkout_error(err: &CheckoutError) -> ApiError {
    let status = match err {
        CheckoutError::Validation(_) | CheckoutError::UnsupportedCurrency(_) => {
            StatusCode::BAD_REQUEST
        }
        CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::PaymentProvider(_) | CheckoutError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    error_response(status, err.user_message())
}

fn mismatched_session(rail: Rail) -> ApiError {
    tracing::error!(rail = %rail, "Checkout returned a session for the wrong rail");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        catalog: state.catalog.health_check().await,
    })
}

/// Card-rail checkout: creates a Stripe PaymentIntent
pub async fn create_intent(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CardCheckoutResponse>, ApiError> {
    let outcome = state
        .checkout
        .checkout(Rail::Card, &body)
        .await
        .map_err(|e| checkout_error(&e))?;

    let RailSession::Card { client_secret, .. } = outcome.session else {
        return Err(mismatched_session(Rail::Card));
    };

    Ok(Json(CardCheckoutResponse {
        client_secret,
        amount: outcome.amount,
        product_title: outcome.product_title,
    }))
}

/// Regional-rail checkout: creates a Mercado Pago preference
pub async fn create_regional(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RegionalCheckoutResponse>, ApiError> {
    let outcome = state
        .checkout
        .checkout(Rail::Regional, &body)
        .await
        .map_err(|e| checkout_error(&e))?;

    let RailSession::Regional {
        preference_id,
        redirect_url,
    } = outcome.session
    else {
        return Err(mismatched_session(Rail::Regional));
    };

    Ok(Json(RegionalCheckoutResponse {
        preference_id,
        init_point: redirect_url,
        amount: outcome.amount,
        product_title: outcome.product_title,
    }))
}

/// Public storefront for a creator
pub async fn public_storefront(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Storefront>, ApiError> {
    match state.catalog.storefront(&username).await {
        Ok(Some(storefront)) => Ok(Json(storefront)),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, "User not found")),
        Err(e) if e.is_client_error() => {
            tracing::warn!(error = %e, "Rejected storefront lookup");
            Err(error_response(StatusCode::BAD_REQUEST, "Invalid username"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Storefront lookup failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ))
        }
    }
}

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    receive_webhook(&state, &state.stripe_webhooks, &headers, &body).await
}

/// Mercado Pago webhook handler
pub async fn mercadopago_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    receive_webhook(&state, &state.mercadopago_webhooks, &headers, &body).await
}

async fn receive_webhook(
    state: &AppState,
    verifier: &WebhookVerifier,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<StatusCode, ApiError> {
    let rail = verifier.rail();

    let signature = headers
        .get(verifier.header_name())
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!(rail = %rail, "Webhook without signature header");
            error_response(StatusCode::BAD_REQUEST, "Missing signature")
        })?;

    // Nothing in the body is looked at before this succeeds
    let event = verifier.verify(body, signature).map_err(|e| {
        tracing::warn!(rail = %rail, error = %e, "Webhook verification failed");
        match e {
            PaymentError::WebhookParse(_) => {
                error_response(StatusCode::BAD_REQUEST, "Invalid payload")
            }
            _ => error_response(StatusCode::BAD_REQUEST, "Invalid signature"),
        }
    })?;

    state.webhook_handler.handle(event).await.map_err(|e| {
        tracing::error!(rail = %rail, error = %e, "Webhook processing error");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Webhook processing failed",
        )
    })?;

    Ok(StatusCode::OK)
}
