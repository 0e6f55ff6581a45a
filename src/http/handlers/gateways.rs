use crate::gateways::registry::GatewayInfo;
use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct GatewaysView {
    pub default_gateway: String,
    pub gateways: Vec<GatewayInfo>,
}

pub async fn list_gateways(State(state): State<AppState>) -> impl IntoResponse {
    let service = &state.payment_service;
    (
        axum::http::StatusCode::OK,
        Json(GatewaysView {
            default_gateway: service.default_gateway().to_string(),
            gateways: service.gateways_info().to_vec(),
        }),
    )
}
