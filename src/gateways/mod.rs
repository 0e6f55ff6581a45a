use crate::domain::payment::{Metadata, PaymentData, PaymentOperationResult};
use crate::money::AmountError;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod mock;
pub mod razorpay;
pub mod registry;
pub mod signature;
pub mod stripe;
pub mod webhook;

/// Everything an adapter can run into while talking to its vendor.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{message}")]
    Api {
        kind: String,
        code: Option<String>,
        message: String,
        http_status: u16,
    },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected gateway response: {0}")]
    Decode(String),
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("invalid request path: {0}")]
    InvalidPath(String),
}

impl GatewayError {
    pub fn kind(&self) -> &str {
        match self {
            GatewayError::Api { kind, .. } => kind,
            GatewayError::Transport(e) if e.is_timeout() => "timeout",
            GatewayError::Transport(_) => "transport",
            GatewayError::Decode(_) => "decode",
            GatewayError::Payload(_) => "payload",
            GatewayError::Amount(_) => "invalid_amount",
            GatewayError::InvalidPath(_) => "invalid_request",
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Api { code, .. } => code.as_deref(),
            GatewayError::Transport(e) if e.is_timeout() => Some("TIMEOUT"),
            GatewayError::Transport(_) => Some("NETWORK_ERROR"),
            GatewayError::InvalidPath(_) => Some("INVALID_REQUEST"),
            _ => None,
        }
    }
}

/// The one place vendor failures turn into results. Logs the original error
/// on the error channel, then returns the canonical failure shape.
pub fn normalize_failure(gateway: &str, err: &GatewayError) -> PaymentOperationResult {
    tracing::error!(
        gateway,
        exception = err.kind(),
        code = err.code().unwrap_or(""),
        message = %err,
        "payment api error"
    );
    PaymentOperationResult::failed(err.to_string(), err.code().map(ToString::to_string))
}

/// Folds an adapter step into a result, normalizing any error.
pub fn settle(gateway: &str, outcome: Result<PaymentOperationResult, GatewayError>) -> PaymentOperationResult {
    outcome.unwrap_or_else(|e| normalize_failure(gateway, &e))
}

/// Reads a vendor response body, routing non-2xx through the adapter's
/// error translation.
pub(crate) async fn read_json(
    resp: reqwest::Response,
    translate: fn(u16, &serde_json::Value) -> GatewayError,
) -> Result<serde_json::Value, GatewayError> {
    let status = resp.status();
    let text = resp.text().await?;
    let body: serde_json::Value = if text.trim().is_empty() {
        serde_json::Value::Null
    } else {
        match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) if !status.is_success() => serde_json::json!({ "message": text.chars().take(200).collect::<String>() }),
            Err(e) => return Err(GatewayError::Decode(e.to_string())),
        }
    };

    if status.is_success() {
        Ok(body)
    } else {
        Err(translate(status.as_u16(), &body))
    }
}

pub(crate) fn str_field(v: &serde_json::Value, key: &str) -> Result<String, GatewayError> {
    v.get(key)
        .and_then(|x| x.as_str())
        .map(ToString::to_string)
        .ok_or_else(|| GatewayError::Decode(format!("missing field `{key}`")))
}

/// Appends `segments` to `base`, percent-encoding each one so an id can never
/// leave its own path segment. `.`/`..` and empty segments are refused because
/// the url crate would drop them and shift the request onto another endpoint.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<reqwest::Url, GatewayError> {
    if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
        return Err(GatewayError::InvalidPath(format!("segment `{bad}` is not allowed")));
    }
    let mut url = reqwest::Url::parse(base).map_err(|e| GatewayError::InvalidPath(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| GatewayError::InvalidPath(format!("{base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn i64_field(v: &serde_json::Value, key: &str) -> Result<i64, GatewayError> {
    v.get(key)
        .and_then(|x| x.as_i64())
        .ok_or_else(|| GatewayError::Decode(format!("missing field `{key}`")))
}

/// Five-operation contract every processor implements identically.
///
/// None of these return `Err`: vendor and transport failures come back as a
/// result with `success == false`. Callers own timeouts and retries.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Header carrying the vendor's webhook signature.
    fn signature_header(&self) -> &'static str;

    async fn charge(
        &self,
        amount: Decimal,
        payment_data: &PaymentData,
        metadata: &Metadata,
    ) -> PaymentOperationResult;

    /// `None` refunds the full captured amount.
    async fn refund(&self, transaction_id: &str, amount: Option<Decimal>) -> PaymentOperationResult;

    async fn get_status(&self, transaction_id: &str) -> PaymentOperationResult;

    async fn create_intent(&self, amount: Decimal, metadata: &Metadata) -> PaymentOperationResult;

    /// `payload` must be the request body exactly as received.
    async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> PaymentOperationResult;
}
