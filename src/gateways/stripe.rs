use crate::config::GatewaySettings;
use crate::domain::audit::{AuditEntry, AuditType};
use crate::domain::payment::{Metadata, PaymentData, PaymentOperationResult, PaymentStatus};
use crate::domain::webhook::{EventOutcome, WebhookEvent};
use crate::gateways::signature::{verify_hmac_hex, SignatureError};
use crate::gateways::webhook::{self, EventDetails, WebhookSource};
use crate::gateways::{endpoint, read_json, settle, str_field, GatewayError, PaymentGateway};
use crate::money::{MoneyFormat, NativeAmount};
use crate::service::audit_logger::AuditLogger;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.stripe.com";
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub struct StripeGateway {
    pub gateway_name: String,
    pub base_url: String,
    pub secret_key: String,
    pub publishable_key: Option<String>,
    pub webhook_secret: String,
    pub currency: String,
    pub webhook_tolerance_secs: i64,
    pub timeout: Duration,
    pub client: reqwest::Client,
    pub audit: Arc<AuditLogger>,
}

impl StripeGateway {
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
            secret_key: settings.secret_key.clone(),
            publishable_key: settings.publishable_key.clone(),
            webhook_secret: settings.webhook_secret.clone().unwrap_or_default(),
            currency: settings.currency.to_ascii_lowercase(),
            webhook_tolerance_secs: settings.webhook_tolerance_secs,
            timeout: settings.timeout(),
            client,
            audit,
        }
    }

    fn format(&self) -> MoneyFormat {
        MoneyFormat::minor_units_for(&self.currency)
    }

    fn minor_amount(&self, amount: Decimal) -> Result<String, GatewayError> {
        match self.format().format(amount)? {
            NativeAmount::Minor(v) => Ok(v.to_string()),
            NativeAmount::Major(d) => Ok(d.to_string()),
        }
    }

    /// Amount fields on Stripe objects are minor units in the object's own currency.
    fn object_amount(&self, object: &serde_json::Value) -> Option<Decimal> {
        let minor = object.get("amount").and_then(|v| v.as_i64())?;
        let format = object
            .get("currency")
            .and_then(|c| c.as_str())
            .map(MoneyFormat::minor_units_for)
            .unwrap_or_else(|| self.format());
        Some(format.minor_to_decimal(minor))
    }

    async fn post(
        &self,
        path: &[&str],
        form: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<serde_json::Value, GatewayError> {
        let mut req = self
            .client
            .post(endpoint(&self.base_url, path)?)
            .bearer_auth(&self.secret_key)
            .form(form)
            .timeout(self.timeout);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        read_json(req.send().await?, vendor_error).await
    }

    async fn get(&self, path: &[&str]) -> Result<serde_json::Value, GatewayError> {
        let resp = self
            .client
            .get(endpoint(&self.base_url, path)?)
            .bearer_auth(&self.secret_key)
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
        let mut form = vec![
            ("amount".to_string(), self.minor_amount(amount)?),
            ("currency".to_string(), self.currency.clone()),
            ("confirm".to_string(), "true".to_string()),
        ];
        if let Some(pm) = &payment_data.payment_method_id {
            form.push(("payment_method".to_string(), pm.clone()));
        }
        push_metadata(&mut form, metadata);

        let intent = self
            .post(&["v1", "payment_intents"], &form, payment_data.idempotency_key.as_deref())
            .await?;
        let id = str_field(&intent, "id")?;
        let status = str_field(&intent, "status")?;

        self.audit
            .record(
                AuditEntry::new(AuditType::Charge, &self.gateway_name)
                    .amount(Some(amount))
                    .transaction_id(Some(id.clone()))
                    .reference_id(metadata.get("order_id").cloned())
                    .status(Some(status.clone())),
            )
            .await;

        Ok(PaymentOperationResult::from_status(&status, normalize_status(&status))
            .with_transaction_id(id)
            .with_raw(intent))
    }

    async fn try_refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> Result<PaymentOperationResult, GatewayError> {
        let mut form = vec![("payment_intent".to_string(), transaction_id.to_string())];
        if let Some(a) = amount {
            form.push(("amount".to_string(), self.minor_amount(a)?));
        }

        let refund = self.post(&["v1", "refunds"], &form, None).await?;
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

        Ok(PaymentOperationResult::from_status(&status, normalize_status(&status))
            .with_refund_id(refund_id)
            .with_transaction_id(transaction_id)
            .with_raw(refund))
    }

    async fn try_get_status(&self, transaction_id: &str) -> Result<PaymentOperationResult, GatewayError> {
        let intent = self.get(&["v1", "payment_intents", transaction_id]).await?;
        let status = str_field(&intent, "status")?;
        let mut result = PaymentOperationResult::succeeded()
            .with_transaction_id(transaction_id)
            .with_status(&status, normalize_status(&status));
        if let Some(amount) = self.object_amount(&intent) {
            result = result.with_amount(amount);
        }
        Ok(result.with_raw(intent))
    }

    async fn try_create_intent(
        &self,
        amount: Decimal,
        metadata: &Metadata,
    ) -> Result<PaymentOperationResult, GatewayError> {
        let mut form = vec![
            ("amount".to_string(), self.minor_amount(amount)?),
            ("currency".to_string(), self.currency.clone()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        push_metadata(&mut form, metadata);

        let intent = self.post(&["v1", "payment_intents"], &form, None).await?;
        let id = str_field(&intent, "id")?;
        let client_secret = intent
            .get("client_secret")
            .and_then(|v| v.as_str())
            .map(ToString::to_string);

        Ok(PaymentOperationResult::succeeded()
            .with_intent_id(id)
            .with_client_secret(client_secret)
            .with_publishable_key(self.publishable_key.clone())
            .with_amount(amount))
    }
}

fn push_metadata(form: &mut Vec<(String, String)>, metadata: &Metadata) {
    for (k, v) in metadata {
        form.push((format!("metadata[{k}]"), v.clone()));
    }
}

pub fn normalize_status(status: &str) -> PaymentStatus {
    match status {
        "succeeded" => PaymentStatus::Succeeded,
        "processing" | "pending" => PaymentStatus::Pending,
        "requires_action" | "requires_confirmation" | "requires_payment_method" | "requires_capture" => {
            PaymentStatus::RequiresAction
        }
        "canceled" => PaymentStatus::Canceled,
        "failed" => PaymentStatus::Failed,
        other => PaymentStatus::from_common(other),
    }
}

/// Stripe wraps failures as `{"error": {"type", "code", "decline_code", "message"}}`.
fn vendor_error(http_status: u16, body: &serde_json::Value) -> GatewayError {
    let err = body.get("error").unwrap_or(body);
    let field = |k: &str| err.get(k).and_then(|v| v.as_str()).map(ToString::to_string);
    GatewayError::Api {
        kind: field("type").unwrap_or_else(|| "api_error".to_string()),
        code: field("code").or_else(|| field("decline_code")),
        message: field("message").unwrap_or_else(|| format!("stripe request failed with HTTP {http_status}")),
        http_status,
    }
}

impl WebhookSource for StripeGateway {
    fn gateway_name(&self) -> &str {
        &self.gateway_name
    }

    fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// `t=<unix>,v1=<hex>[,v1=<hex>...]`, signed over `"<t>.<raw body>"`.
    fn verify_signature(&self, payload: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let header = signature.filter(|s| !s.trim().is_empty()).ok_or(SignatureError::Missing)?;

        let mut timestamp: Option<&str> = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", v)) => timestamp = Some(v),
                Some(("v1", v)) => candidates.push(v),
                _ => {}
            }
        }
        let t = timestamp.ok_or(SignatureError::Malformed)?;
        let issued_at = t.parse::<i64>().map_err(|_| SignatureError::Malformed)?;
        if candidates.is_empty() {
            return Err(SignatureError::Malformed);
        }

        let parts: [&[u8]; 3] = [t.as_bytes(), b".", payload];
        let matched = candidates
            .iter()
            .any(|sig| verify_hmac_hex(self.webhook_secret.as_bytes(), &parts, sig).is_ok());
        if !matched {
            return Err(SignatureError::Mismatch);
        }

        if self.webhook_tolerance_secs > 0 {
            let age = chrono::Utc::now().timestamp() - issued_at;
            if age.abs() > self.webhook_tolerance_secs {
                return Err(SignatureError::Expired);
            }
        }
        Ok(())
    }

    fn parse_event(&self, payload: &[u8]) -> Result<WebhookEvent, GatewayError> {
        let v: serde_json::Value = serde_json::from_slice(payload)?;
        let data_object = v
            .get("data")
            .and_then(|d| d.get("object"))
            .cloned()
            .ok_or_else(|| GatewayError::Decode("missing field `data.object`".to_string()))?;
        Ok(WebhookEvent {
            event_type: str_field(&v, "type")?,
            event_id: v.get("id").and_then(|x| x.as_str()).map(ToString::to_string),
            data_object,
        })
    }

    fn describe(&self, event: &WebhookEvent) -> Result<Option<EventDetails>, GatewayError> {
        let outcome = match event.event_type.as_str() {
            "payment_intent.succeeded" => EventOutcome::Succeeded,
            "payment_intent.payment_failed" => EventOutcome::Failed,
            _ => return Ok(None),
        };
        let object = &event.data_object;
        let error = match outcome {
            EventOutcome::Failed => object
                .get("last_payment_error")
                .map(|e| e.get("message").cloned().unwrap_or_else(|| e.clone())),
            EventOutcome::Succeeded => None,
        };

        Ok(Some(EventDetails {
            outcome,
            transaction_id: Some(str_field(object, "id")?),
            vendor_status: object.get("status").and_then(|s| s.as_str()).map(ToString::to_string),
            amount: Some(
                self.object_amount(object)
                    .ok_or_else(|| GatewayError::Decode("missing field `amount`".to_string()))?,
            ),
            error,
        }))
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_vendor_statuses_explicitly() {
        assert_eq!(normalize_status("succeeded"), PaymentStatus::Succeeded);
        assert_eq!(normalize_status("requires_action"), PaymentStatus::RequiresAction);
        assert_eq!(normalize_status("processing"), PaymentStatus::Pending);
        assert_eq!(normalize_status("canceled"), PaymentStatus::Canceled);
    }

    #[test]
    fn translates_stripe_error_body() {
        let body = serde_json::json!({
            "error": {"type": "card_error", "decline_code": "insufficient_funds", "message": "Your card has insufficient funds."}
        });
        match vendor_error(402, &body) {
            GatewayError::Api { kind, code, message, http_status } => {
                assert_eq!(kind, "card_error");
                assert_eq!(code.as_deref(), Some("insufficient_funds"));
                assert_eq!(message, "Your card has insufficient funds.");
                assert_eq!(http_status, 402);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
