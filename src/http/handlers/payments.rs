use crate::domain::payment::{ErrorEnvelope, ErrorPayload, Metadata, PaymentData};
use crate::gateways::registry::RegistryError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ChargeRequest {
    pub gateway: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub payment_data: PaymentData,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub gateway: Option<String>,
    pub transaction_id: String,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub gateway: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub gateway: Option<String>,
}

pub(crate) fn unsupported(e: RegistryError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorEnvelope {
            error: ErrorPayload {
                code: "UNSUPPORTED_GATEWAY".to_string(),
                message: e.to_string(),
                details: None,
            },
        }),
    )
        .into_response()
}

pub async fn charge(State(state): State<AppState>, Json(req): Json<ChargeRequest>) -> impl IntoResponse {
    match state.payment_service.gateway(req.gateway.as_deref()) {
        Ok(gateway) => {
            let result = gateway.charge(req.amount, &req.payment_data, &req.metadata).await;
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => unsupported(e),
    }
}

pub async fn refund(State(state): State<AppState>, Json(req): Json<RefundRequest>) -> impl IntoResponse {
    match state.payment_service.gateway(req.gateway.as_deref()) {
        Ok(gateway) => {
            let result = gateway.refund(&req.transaction_id, req.amount).await;
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => unsupported(e),
    }
}

pub async fn status(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Query(q): Query<GatewayQuery>,
) -> impl IntoResponse {
    match state.payment_service.gateway(q.gateway.as_deref()) {
        Ok(gateway) => (StatusCode::OK, Json(gateway.get_status(&transaction_id).await)).into_response(),
        Err(e) => unsupported(e),
    }
}

pub async fn create_intent(State(state): State<AppState>, Json(req): Json<IntentRequest>) -> impl IntoResponse {
    match state.payment_service.gateway(req.gateway.as_deref()) {
        Ok(gateway) => {
            let result = gateway.create_intent(req.amount, &req.metadata).await;
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => unsupported(e),
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
