use crate::gateways::webhook::INVALID_SIGNATURE;
use crate::http::handlers::payments::unsupported;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

/// Body bytes go to the adapter untouched; signatures are computed over them.
pub async fn receive(
    State(state): State<AppState>,
    Path(gateway_name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let gateway = match state.payment_service.gateway(Some(&gateway_name)) {
        Ok(g) => g,
        Err(e) => return unsupported(e),
    };
    let signature = headers
        .get(gateway.signature_header())
        .and_then(|h| h.to_str().ok());

    let result = gateway.handle_webhook(&body, signature).await;
    let status = if result.success {
        StatusCode::OK
    } else if result.error.as_deref() == Some(INVALID_SIGNATURE) {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result)).into_response()
}
