use crate::http::handlers::{gateways, payments, webhooks};
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(payments::health))
        .route("/gateways", get(gateways::list_gateways))
        .route("/payments/charge", post(payments::charge))
        .route("/payments/refund", post(payments::refund))
        .route("/payments/intents", post(payments::create_intent))
        .route("/payments/:transaction_id/status", get(payments::status))
        .route("/webhooks/:gateway", post(webhooks::receive))
        .with_state(state)
}
