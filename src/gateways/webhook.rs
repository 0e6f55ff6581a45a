use crate::domain::audit::{AuditEntry, AuditType};
use crate::domain::payment::PaymentOperationResult;
use crate::domain::webhook::{EventOutcome, WebhookEvent, WebhookStage};
use crate::gateways::signature::SignatureError;
use crate::gateways::{normalize_failure, GatewayError};
use crate::service::audit_logger::AuditLogger;
use rust_decimal::Decimal;

pub const INVALID_SIGNATURE: &str = "Invalid signature";

/// Fields a known event type pulls out of its vendor object.
#[derive(Debug, Clone)]
pub struct EventDetails {
    pub outcome: EventOutcome,
    pub transaction_id: Option<String>,
    pub vendor_status: Option<String>,
    pub amount: Option<Decimal>,
    pub error: Option<serde_json::Value>,
}

/// Vendor-specific half of webhook handling; the flow itself lives in `process`.
pub trait WebhookSource: Send + Sync {
    fn gateway_name(&self) -> &str;

    fn audit(&self) -> &AuditLogger;

    fn verify_signature(&self, payload: &[u8], signature: Option<&str>) -> Result<(), SignatureError>;

    fn parse_event(&self, payload: &[u8]) -> Result<WebhookEvent, GatewayError>;

    /// `Ok(None)` for event types outside the adapter's table.
    fn describe(&self, event: &WebhookEvent) -> Result<Option<EventDetails>, GatewayError>;
}

/// RECEIVED -> VERIFIED -> DISPATCHED -> ACKNOWLEDGED, or REJECTED on a bad
/// signature. Rejected payloads never reach the audit store.
pub async fn process<S>(source: &S, payload: &[u8], signature: Option<&str>) -> PaymentOperationResult
where
    S: WebhookSource + ?Sized,
{
    let gateway = source.gateway_name();
    tracing::debug!(gateway, stage = ?WebhookStage::Received, bytes = payload.len(), "webhook received");

    if let Err(e) = source.verify_signature(payload, signature) {
        tracing::warn!(gateway, stage = ?WebhookStage::Rejected, reason = %e, "webhook rejected");
        return PaymentOperationResult::failed(INVALID_SIGNATURE, None).with_message(e.to_string());
    }
    tracing::debug!(gateway, stage = ?WebhookStage::Verified, "webhook verified");

    match dispatch(source, payload).await {
        Ok(event_type) => {
            tracing::info!(gateway, stage = ?WebhookStage::Acknowledged, event_type = %event_type, "webhook processed");
            PaymentOperationResult::succeeded()
                .with_event_type(event_type)
                .with_message("Webhook processed successfully")
        }
        Err(e) => normalize_failure(gateway, &e),
    }
}

async fn dispatch<S>(source: &S, payload: &[u8]) -> Result<String, GatewayError>
where
    S: WebhookSource + ?Sized,
{
    let event = source.parse_event(payload)?;
    let details = match source.describe(&event) {
        Ok(details) => details,
        Err(e) => {
            // Verified events always leave a trace, even when the object is incomplete.
            let entry = audit_entry(source.gateway_name(), &event, None).meta("error", e.to_string());
            source.audit().record(entry).await;
            return Err(e);
        }
    };
    tracing::debug!(
        gateway = source.gateway_name(),
        stage = ?WebhookStage::Dispatched,
        event_type = %event.event_type,
        known = details.is_some(),
        "webhook dispatched"
    );

    let entry = audit_entry(source.gateway_name(), &event, details);
    source.audit().record(entry).await;
    Ok(event.event_type)
}

pub fn audit_entry(gateway: &str, event: &WebhookEvent, details: Option<EventDetails>) -> AuditEntry {
    let mut entry = AuditEntry::new(AuditType::Webhook, gateway).meta("event_type", event.event_type.as_str());

    match details {
        None => {
            if let Some(id) = &event.event_id {
                entry = entry.meta("event_id", id.as_str());
            }
        }
        Some(d) => {
            let normalized = match d.outcome {
                EventOutcome::Succeeded => "succeeded",
                EventOutcome::Failed => "failed",
            };
            entry = entry
                .transaction_id(d.transaction_id)
                .status(Some(normalized.to_string()))
                .amount(d.amount);
            if let Some(id) = &event.event_id {
                entry = entry.meta("event_id", id.as_str());
            }
            if let Some(vs) = d.vendor_status {
                entry = entry.meta("vendor_status", vs);
            }
            if let Some(err) = d.error {
                entry = entry.meta("error", err);
            }
        }
    }

    entry
}
