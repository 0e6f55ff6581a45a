use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::payment::PaymentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditType {
    Charge,
    Refund,
    Webhook,
}

impl AuditType {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditType::Charge => "charge",
            AuditType::Refund => "refund",
            AuditType::Webhook => "webhook",
        }
    }
}

/// One operation attempt. Created by the audit logger, never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(rename = "type")]
    pub entry_type: AuditType,
    pub gateway_name: String,
    pub amount: Option<Decimal>,
    pub transaction_id: Option<String>,
    pub reference_id: Option<String>,
    pub status: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AuditEntry {
    pub fn new(entry_type: AuditType, gateway_name: &str) -> Self {
        Self {
            entry_type,
            gateway_name: gateway_name.to_string(),
            amount: None,
            transaction_id: None,
            reference_id: None,
            status: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn amount(mut self, amount: Option<Decimal>) -> Self {
        self.amount = amount;
        self
    }

    pub fn transaction_id(mut self, id: Option<String>) -> Self {
        self.transaction_id = id;
        self
    }

    pub fn reference_id(mut self, id: Option<String>) -> Self {
        self.reference_id = id;
        self
    }

    pub fn status(mut self, status: Option<String>) -> Self {
        self.status = status;
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Reporting scopes over the stored trail; the payment path never reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusScope {
    Successful,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub gateway_name: Option<String>,
    pub entry_type: Option<AuditType>,
    pub status_scope: Option<StatusScope>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(g) = &self.gateway_name {
            if &entry.gateway_name != g {
                return false;
            }
        }
        if let Some(t) = self.entry_type {
            if entry.entry_type != t {
                return false;
            }
        }
        match self.status_scope {
            None => true,
            Some(scope) => {
                let status = entry
                    .status
                    .as_deref()
                    .map(PaymentStatus::from_common)
                    .unwrap_or(PaymentStatus::Unknown);
                match scope {
                    StatusScope::Successful => status.is_success_family(),
                    StatusScope::Failed => status.is_failure_family(),
                }
            }
        }
    }
}
