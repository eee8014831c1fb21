//! Router assembly

use std::any::Any as PanicPayload;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    ErrorResponse, create_intent, create_regional, health_check, mercadopago_webhook,
    public_storefront, stripe_webhook,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Checkout
        .route("/payments/create-intent", post(create_intent))
        .route("/payments/regional", post(create_regional))
        // Storefront
        .route("/public/{username}", get(public_storefront))
        // Webhooks
        .route("/webhooks/stripe", post(stripe_webhook))
        .route("/webhooks/mercadopago", post(mercadopago_webhook))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handle_panic(_payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".into(),
        }),
    )
        .into_response()
}
