use crate::config::GatewaySettings;
use crate::domain::audit::{AuditEntry, AuditType};
use crate::domain::payment::{Metadata, PaymentData, PaymentOperationResult, PaymentStatus};
use crate::domain::webhook::{EventOutcome, WebhookEvent};
use crate::gateways::signature::{verify_hmac_hex, SignatureError};
use crate::gateways::webhook::{self, EventDetails, WebhookSource};
use crate::gateways::{settle, str_field, GatewayError, PaymentGateway};
use crate::money::{MoneyFormat, NativeAmount};
use crate::service::audit_logger::AuditLogger;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const SIGNATURE_HEADER: &str = "X-Mock-Signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    AlwaysSuccess,
    AlwaysFailure,
    AlwaysTimeout,
}

impl MockBehavior {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_uppercase).as_deref() {
            Some("ALWAYS_FAILURE") => MockBehavior::AlwaysFailure,
            Some("ALWAYS_TIMEOUT") => MockBehavior::AlwaysTimeout,
            _ => MockBehavior::AlwaysSuccess,
        }
    }
}

#[derive(Debug, Clone)]
struct MockPayment {
    amount: Decimal,
    refunded: Decimal,
    status: String,
}

/// In-process stand-in for a decimal-native processor. The ledger plays the
/// role of the remote vendor, so status lookups see earlier charges.
pub struct MockGateway {
    pub gateway_name: String,
    pub behavior: MockBehavior,
    pub webhook_secret: String,
    pub publishable_key: Option<String>,
    pub audit: Arc<AuditLogger>,
    ledger: RwLock<HashMap<String, MockPayment>>,
}

impl MockGateway {
    pub fn new(gateway_name: &str, settings: &GatewaySettings, audit: Arc<AuditLogger>) -> Self {
        Self {
            gateway_name: gateway_name.to_string(),
            behavior: MockBehavior::parse(settings.mock_behavior.as_deref()),
            webhook_secret: settings.webhook_secret.clone().unwrap_or_default(),
            publishable_key: settings.publishable_key.clone(),
            audit,
            ledger: RwLock::new(HashMap::new()),
        }
    }

    fn format(&self) -> MoneyFormat {
        MoneyFormat::MajorUnits
    }

    fn native(&self, amount: Decimal) -> Result<Decimal, GatewayError> {
        match self.format().format(amount)? {
            NativeAmount::Major(d) => Ok(d),
            NativeAmount::Minor(v) => Ok(Decimal::from(v)),
        }
    }

    fn vendor_unavailable(&self) -> Result<(), GatewayError> {
        match self.behavior {
            MockBehavior::AlwaysTimeout => Err(GatewayError::Api {
                kind: "timeout".to_string(),
                code: Some("MOCK_TIMEOUT".to_string()),
                message: "mock timeout".to_string(),
                http_status: 504,
            }),
            _ => Ok(()),
        }
    }

    fn not_found(id: &str) -> GatewayError {
        GatewayError::Api {
            kind: "invalid_request".to_string(),
            code: Some("RESOURCE_MISSING".to_string()),
            message: format!("No such payment: {id}"),
            http_status: 404,
        }
    }

    async fn try_charge(
        &self,
        amount: Decimal,
        payment_data: &PaymentData,
        metadata: &Metadata,
    ) -> Result<PaymentOperationResult, GatewayError> {
        let native = self.native(amount)?;
        self.vendor_unavailable()?;

        let status = match self.behavior {
            MockBehavior::AlwaysFailure => "FAILED",
            _ => "COMPLETED",
        };
        let id = format!("mock_txn_{}", uuid::Uuid::new_v4());
        self.ledger.write().await.insert(
            id.clone(),
            MockPayment {
                amount: native,
                refunded: Decimal::ZERO,
                status: status.to_string(),
            },
        );

        self.audit
            .record(
                AuditEntry::new(AuditType::Charge, &self.gateway_name)
                    .amount(Some(amount))
                    .transaction_id(Some(id.clone()))
                    .reference_id(metadata.get("order_id").cloned())
                    .status(Some(status.to_string())),
            )
            .await;

        let raw = serde_json::json!({
            "id": id,
            "status": status,
            "amount": native.to_string(),
            "payment_method": payment_data.payment_method_id,
            "metadata": metadata,
        });
        let mut result = PaymentOperationResult::from_status(status, normalize_status(status))
            .with_transaction_id(id)
            .with_raw(raw);
        if status == "FAILED" {
            result.error_code = Some("MOCK_DECLINED".to_string());
        }
        Ok(result)
    }

    async fn try_refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> Result<PaymentOperationResult, GatewayError> {
        let requested = amount.map(|a| self.native(a)).transpose()?;
        self.vendor_unavailable()?;

        let (refund_id, payment_status) = {
            let mut ledger = self.ledger.write().await;
            let payment = ledger
                .get_mut(transaction_id)
                .ok_or_else(|| Self::not_found(transaction_id))?;
            let remaining = payment.amount - payment.refunded;
            if payment.status != "COMPLETED" && payment.status != "PARTIALLY_REFUNDED" {
                return Err(GatewayError::Api {
                    kind: "invalid_request".to_string(),
                    code: Some("NOT_REFUNDABLE".to_string()),
                    message: format!("payment {transaction_id} is {} and cannot be refunded", payment.status),
                    http_status: 400,
                });
            }
            let refund_amount = requested.unwrap_or(remaining);
            if refund_amount > remaining || refund_amount <= Decimal::ZERO {
                return Err(GatewayError::Api {
                    kind: "invalid_request".to_string(),
                    code: Some("REFUND_EXCEEDS_REMAINING".to_string()),
                    message: format!("refund of {refund_amount} exceeds remaining {remaining}"),
                    http_status: 400,
                });
            }
            payment.refunded += refund_amount;
            payment.status = if payment.refunded == payment.amount {
                "REFUNDED".to_string()
            } else {
                "PARTIALLY_REFUNDED".to_string()
            };
            (format!("mock_rfnd_{}", uuid::Uuid::new_v4()), payment.status.clone())
        };

        let status = "COMPLETED";
        self.audit
            .record(
                AuditEntry::new(AuditType::Refund, &self.gateway_name)
                    .amount(amount)
                    .transaction_id(Some(transaction_id.to_string()))
                    .status(Some(status.to_string()))
                    .meta("refund_id", refund_id.as_str()),
            )
            .await;

        Ok(PaymentOperationResult::from_status(status, normalize_status(status))
            .with_refund_id(refund_id.clone())
            .with_transaction_id(transaction_id)
            .with_raw(serde_json::json!({
                "id": refund_id,
                "status": status,
                "payment_status": payment_status,
            })))
    }

    async fn try_get_status(&self, transaction_id: &str) -> Result<PaymentOperationResult, GatewayError> {
        self.vendor_unavailable()?;
        let ledger = self.ledger.read().await;
        let payment = ledger
            .get(transaction_id)
            .ok_or_else(|| Self::not_found(transaction_id))?;

        Ok(PaymentOperationResult::succeeded()
            .with_transaction_id(transaction_id)
            .with_status(&payment.status, normalize_status(&payment.status))
            .with_amount(self.format().to_decimal(NativeAmount::Major(payment.amount)))
            .with_raw(serde_json::json!({
                "id": transaction_id,
                "status": payment.status,
                "amount": payment.amount.to_string(),
                "refunded": payment.refunded.to_string(),
            })))
    }

    async fn try_create_intent(&self, amount: Decimal, metadata: &Metadata) -> Result<PaymentOperationResult, GatewayError> {
        let native = self.native(amount)?;
        self.vendor_unavailable()?;
        let id = format!("mock_intent_{}", uuid::Uuid::new_v4().simple());

        Ok(PaymentOperationResult::succeeded()
            .with_intent_id(id.clone())
            .with_client_secret(Some(format!("{id}_secret")))
            .with_publishable_key(self.publishable_key.clone())
            .with_amount(amount)
            .with_raw(serde_json::json!({"id": id, "amount": native.to_string(), "metadata": metadata})))
    }
}

pub fn normalize_status(status: &str) -> PaymentStatus {
    match status {
        "COMPLETED" => PaymentStatus::Succeeded,
        "PENDING" => PaymentStatus::Pending,
        "REFUNDED" | "PARTIALLY_REFUNDED" => PaymentStatus::Refunded,
        "FAILED" => PaymentStatus::Failed,
        other => PaymentStatus::from_common(other),
    }
}

fn decimal_field(v: &serde_json::Value, key: &str) -> Result<Decimal, GatewayError> {
    let raw = match v.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(GatewayError::Decode(format!("missing field `{key}`"))),
    };
    Decimal::from_str(&raw).map_err(|e| GatewayError::Decode(format!("bad `{key}`: {e}")))
}

impl WebhookSource for MockGateway {
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
        Ok(WebhookEvent {
            event_type: str_field(&v, "type")?,
            event_id: v.get("id").and_then(|x| x.as_str()).map(ToString::to_string),
            data_object: v
                .get("data")
                .and_then(|d| d.get("object"))
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        })
    }

    fn describe(&self, event: &WebhookEvent) -> Result<Option<EventDetails>, GatewayError> {
        let outcome = match event.event_type.as_str() {
            "charge.succeeded" => EventOutcome::Succeeded,
            "charge.failed" => EventOutcome::Failed,
            _ => return Ok(None),
        };
        let object = &event.data_object;
        let native = decimal_field(object, "amount")?;

        Ok(Some(EventDetails {
            outcome,
            transaction_id: Some(str_field(object, "id")?),
            vendor_status: object.get("status").and_then(|s| s.as_str()).map(ToString::to_string),
            amount: Some(self.format().to_decimal(NativeAmount::Major(native))),
            error: match outcome {
                EventOutcome::Failed => object.get("error").cloned(),
                EventOutcome::Succeeded => None,
            },
        }))
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
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
