use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caller-supplied correlation data. `order_id` is promoted to the audit reference id.
pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentData {
    pub payment_method_id: Option<String>,
    pub idempotency_key: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Pending,
    RequiresAction,
    Failed,
    Canceled,
    Refunded,
    Unknown,
}

impl PaymentStatus {
    /// Legacy vocabulary shared by the stored audit trail: anything outside the
    /// two families is `Unknown` here and must be mapped by the adapter itself.
    pub fn from_common(status: &str) -> Self {
        match status {
            "succeeded" | "captured" | "settled" | "COMPLETED" => PaymentStatus::Succeeded,
            "failed" | "declined" | "error" | "FAILED" => PaymentStatus::Failed,
            _ => PaymentStatus::Unknown,
        }
    }

    pub fn is_success_family(self) -> bool {
        matches!(self, PaymentStatus::Succeeded)
    }

    pub fn is_failure_family(self) -> bool {
        matches!(self, PaymentStatus::Failed)
    }
}

/// Normalized return value of every adapter operation.
///
/// `success == true` never carries `error`/`error_code`, and `success == false`
/// always carries `error`. Build values through the constructors to keep that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentOperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publishable_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl PaymentOperationResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>, error_code: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            error_code: error_code.filter(|c| !c.is_empty()),
            ..Self::default()
        }
    }

    /// Success follows the normalized status; anything short of `Succeeded`
    /// becomes a failure naming the vendor status.
    pub fn from_status(vendor_status: &str, normalized: PaymentStatus) -> Self {
        let base = if normalized.is_success_family() {
            Self::succeeded()
        } else {
            Self::failed(format!("payment status is {vendor_status}"), None)
        };
        base.with_status(vendor_status, normalized)
    }

    pub fn with_status(mut self, vendor_status: &str, normalized: PaymentStatus) -> Self {
        self.status = Some(vendor_status.to_string());
        self.normalized_status = Some(normalized);
        self
    }

    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn with_refund_id(mut self, id: impl Into<String>) -> Self {
        self.refund_id = Some(id.into());
        self
    }

    pub fn with_intent_id(mut self, id: impl Into<String>) -> Self {
        self.intent_id = Some(id.into());
        self
    }

    pub fn with_client_secret(mut self, secret: Option<String>) -> Self {
        self.client_secret = secret;
        self
    }

    pub fn with_publishable_key(mut self, key: Option<String>) -> Self {
        self.publishable_key = key;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn is_consistent(&self) -> bool {
        if self.success {
            self.error.is_none() && self.error_code.is_none()
        } else {
            self.error.is_some()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
