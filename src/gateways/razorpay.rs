use crate::config::GatewaySettings;
use crate::domain::audit::{AuditEntry, AuditType};
use crate::domain::payment::{Metadata, PaymentData, PaymentOperationResult, PaymentStatus};
use crate::domain::webhook::{EventOutcome, WebhookEvent};
use crate::gateways::signature::{verify_hmac_hex, SignatureError};
use crate::gateways::webhook::{self, EventDetails, WebhookSource};
use crate::gateways::{endpoint, i64_field, read_json, settle, str_field, GatewayError, PaymentGateway};
use crate::money::{MoneyFormat, NativeAmount};
use crate::service::audit_logger::AuditLogger;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.razorpay.com";
pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

pub struct RazorpayGateway {
    pub gateway_name: String,
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub currency: String,
    pub timeout: Duration,
    pub client: reqwest::Client,
    pub audit: Arc<AuditLogger>,
}

impl RazorpayGateway {
    /// `publishable_key` is the key id, `secret_key` the key secret.
    pub fn new(
        gateway_name: &str,
        settings: &GatewaySettings,
        client: reqwest::Client,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            gateway_name: gateway_name.to_string(),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            key_id: settings.publishable_key.clone().unwrap_or_default(),
            key_secret: settings.secret_key.clone(),
            webhook_secret: settings.webhook_secret.clone().unwrap_or_default(),
            currency: settings.currency.to_ascii_uppercase(),
            timeout: settings.timeout(),
            client,
            audit,
        }
    }

    fn format_for(currency: &str) -> MoneyFormat {
        MoneyFormat::minor_units_for(currency)
    }

    fn minor_amount(&self, amount: Decimal) -> Result<i64, GatewayError> {
        match Self::format_for(&self.currency).format(amount)? {
            NativeAmount::Minor(v) => Ok(v),
            NativeAmount::Major(_) => Err(GatewayError::Decode("razorpay expects minor units".to_string())),
        }
    }

    fn entity_amount(&self, entity: &serde_json::Value) -> Result<Decimal, GatewayError> {
        let minor = i64_field(entity, "amount")?;
        let currency = entity
            .get("currency")
            .and_then(|c| c.as_str())
            .unwrap_or(&self.currency);
        Ok(Self::format_for(currency).minor_to_decimal(minor))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<serde_json::Value, GatewayError> {
        let resp = req
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .timeout(self.timeout)
            .send()
            .await?;
        read_json(resp, vendor_error).await
    }

    async fn try_charge(
        &self,
        amount: Decimal,
        payment_data: &PaymentData,
        metadata: &Metadata,
    ) -> Result<PaymentOperationResult, GatewayError> {
        let amount_minor = self.minor_amount(amount)?;
        let payment_id = payment_data.payment_method_id.as_deref().ok_or_else(|| GatewayError::Api {
            kind: "validation_error".to_string(),
            code: Some("BAD_REQUEST_ERROR".to_string()),
            message: "payment_method_id (razorpay payment id) is required".to_string(),
            http_status: 400,
        })?;

        let url = endpoint(&self.base_url, &["v1", "payments", payment_id, "capture"])?;
        let body = json!({
            "amount": amount_minor,
            "currency": self.currency,
            "notes": metadata,
        });
        let payment = self.send(self.client.post(url).json(&body)).await?;
        let id = str_field(&payment, "id")?;
        let status = str_field(&payment, "status")?;

        self.audit
            .record(
                AuditEntry::new(AuditType::Charge, &self.gateway_name)
                    .amount(Some(amount))
                    .transaction_id(Some(id.clone()))
                    .reference_id(metadata.get("order_id").cloned())
                    .status(Some(status.clone())),
            )
            .await;

        Ok(PaymentOperationResult::from_status(&status, normalize_payment_status(&status))
            .with_transaction_id(id)
            .with_raw(payment))
    }

    async fn try_refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> Result<PaymentOperationResult, GatewayError> {
        let mut body = serde_json::Map::new();
        if let Some(a) = amount {
            body.insert("amount".to_string(), json!(self.minor_amount(a)?));
        }

        let url = endpoint(&self.base_url, &["v1", "payments", transaction_id, "refund"])?;
        let refund = self
            .send(self.client.post(url).json(&serde_json::Value::Object(body)))
            .await?;
        let refund_id = str_field(&refund, "id")?;
        let status = str_field(&refund, "status")?;

        self.audit
            .record(
                AuditEntry::new(AuditType::Refund, &self.gateway_name)
                    .amount(amount)
                    .transaction_id(Some(transaction_id.to_string()))
                    .status(Some(status.clone()))
                    .meta("refund_id", refund_id.as_str()),
            )
            .await;

        Ok(PaymentOperationResult::from_status(&status, normalize_refund_status(&status))
            .with_refund_id(refund_id)
            .with_transaction_id(transaction_id)
            .with_raw(refund))
    }

    async fn try_get_status(&self, transaction_id: &str) -> Result<PaymentOperationResult, GatewayError> {
        let url = endpoint(&self.base_url, &["v1", "payments", transaction_id])?;
        let payment = self.send(self.client.get(url)).await?;
        let status = str_field(&payment, "status")?;
        let amount = self.entity_amount(&payment)?;

        Ok(PaymentOperationResult::succeeded()
            .with_transaction_id(transaction_id)
            .with_status(&status, normalize_payment_status(&status))
            .with_amount(amount)
            .with_raw(payment))
    }

    async fn try_create_intent(
        &self,
        amount: Decimal,
        metadata: &Metadata,
    ) -> Result<PaymentOperationResult, GatewayError> {
        let receipt = metadata
            .get("order_id")
            .cloned()
            .unwrap_or_else(|| format!("rcpt_{}", uuid::Uuid::new_v4().simple()));
        let body = json!({
            "amount": self.minor_amount(amount)?,
            "currency": self.currency,
            "receipt": receipt,
            "notes": metadata,
            "payment_capture": 1
        });
        let order = self
            .send(self.client.post(endpoint(&self.base_url, &["v1", "orders"])?).json(&body))
            .await?;
        let order_id = str_field(&order, "id")?;

        // Checkout is opened with the key id and the order id; there is no separate secret.
        Ok(PaymentOperationResult::succeeded()
            .with_intent_id(order_id.clone())
            .with_client_secret(Some(order_id))
            .with_publishable_key(Some(self.key_id.clone()).filter(|k| !k.is_empty()))
            .with_amount(amount)
            .with_raw(order))
    }
}

pub fn normalize_payment_status(status: &str) -> PaymentStatus {
    match status {
        "captured" => PaymentStatus::Succeeded,
        "created" => PaymentStatus::Pending,
        "authorized" => PaymentStatus::RequiresAction,
        "refunded" => PaymentStatus::Refunded,
        "failed" => PaymentStatus::Failed,
        other => PaymentStatus::from_common(other),
    }
}

pub fn normalize_refund_status(status: &str) -> PaymentStatus {
    match status {
        "processed" => PaymentStatus::Succeeded,
        "pending" => PaymentStatus::Pending,
        "failed" => PaymentStatus::Failed,
        other => PaymentStatus::from_common(other),
    }
}

/// Razorpay failures look like `{"error": {"code", "description", "reason"}}`.
fn vendor_error(http_status: u16, body: &serde_json::Value) -> GatewayError {
    let err = body.get("error").unwrap_or(body);
    let field = |k: &str| err.get(k).and_then(|v| v.as_str()).map(ToString::to_string);
    GatewayError::Api {
        kind: field("reason")
            .or_else(|| field("source"))
            .unwrap_or_else(|| "api_error".to_string()),
        code: field("code").or_else(|| Some(format!("HTTP_{http_status}"))),
        message: field("description")
            .or_else(|| field("message"))
            .unwrap_or_else(|| format!("razorpay request failed with HTTP {http_status}")),
        http_status,
    }
}

impl WebhookSource for RazorpayGateway {
    fn gateway_name(&self) -> &str {
        &self.gateway_name
    }

    fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    fn verify_signature(&self, payload: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let sig = signature.filter(|s| !s.trim().is_empty()).ok_or(SignatureError::Missing)?;
        verify_hmac_hex(self.webhook_secret.as_bytes(), &[payload], sig)
    }

    fn parse_event(&self, payload: &[u8]) -> Result<WebhookEvent, GatewayError> {
        let v: serde_json::Value = serde_json::from_slice(payload)?;
        let data_object = v
            .get("payload")
            .and_then(|p| p.get("payment"))
            .and_then(|p| p.get("entity"))
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        Ok(WebhookEvent {
            event_type: str_field(&v, "event")?,
            event_id: v.get("id").and_then(|x| x.as_str()).map(ToString::to_string),
            data_object,
        })
    }

    fn describe(&self, event: &WebhookEvent) -> Result<Option<EventDetails>, GatewayError> {
        let outcome = match event.event_type.as_str() {
            "payment.captured" => EventOutcome::Succeeded,
            "payment.failed" => EventOutcome::Failed,
            _ => return Ok(None),
        };
        let entity = &event.data_object;
        let error = match outcome {
            EventOutcome::Failed => entity.get("error_description").cloned(),
            EventOutcome::Succeeded => None,
        };

        Ok(Some(EventDetails {
            outcome,
            transaction_id: Some(str_field(entity, "id")?),
            vendor_status: entity.get("status").and_then(|s| s.as_str()).map(ToString::to_string),
            amount: Some(self.entity_amount(entity)?),
            error,
        }))
    }
}

#[async_trait::async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &str {
        &self.gateway_name
    }

    fn signature_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }

    async fn charge(
        &self,
        amount: Decimal,
        payment_data: &PaymentData,
        metadata: &Metadata,
    ) -> PaymentOperationResult {
        settle(&self.gateway_name, self.try_charge(amount, payment_data, metadata).await)
    }

    async fn refund(&self, transaction_id: &str, amount: Option<Decimal>) -> PaymentOperationResult {
        settle(&self.gateway_name, self.try_refund(transaction_id, amount).await)
    }

    async fn get_status(&self, transaction_id: &str) -> PaymentOperationResult {
        settle(&self.gateway_name, self.try_get_status(transaction_id).await)
    }

    async fn create_intent(&self, amount: Decimal, metadata: &Metadata) -> PaymentOperationResult {
        settle(&self.gateway_name, self.try_create_intent(amount, metadata).await)
    }

    async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> PaymentOperationResult {
        webhook::process(self, payload, signature).await
    }
}
