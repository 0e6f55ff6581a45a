use crate::domain::audit::AuditEntry;
use crate::repo::audit_repo::AuditStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub enabled: bool,
    pub channel: String,
    pub write_timeout: Duration,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: "payments".to_string(),
            write_timeout: Duration::from_millis(2000),
        }
    }
}

/// Outcome of one `record` call. Callers may inspect it but never have to:
/// nothing here is allowed to fail the payment operation that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditWrite {
    Persisted,
    Disabled,
    Failed(String),
    TimedOut,
}

pub struct AuditLogger {
    settings: AuditSettings,
    store: Arc<dyn AuditStore>,
    failures: AtomicU64,
}

impl AuditLogger {
    pub fn new(settings: AuditSettings, store: Arc<dyn AuditStore>) -> Self {
        Self {
            settings,
            store,
            failures: AtomicU64::new(0),
        }
    }

    /// Number of entries that could not be persisted since startup.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub async fn record(&self, entry: AuditEntry) -> AuditWrite {
        if !self.settings.enabled {
            return AuditWrite::Disabled;
        }

        tracing::info!(
            channel = %self.settings.channel,
            audit_type = entry.entry_type.as_str(),
            gateway = %entry.gateway_name,
            amount = ?entry.amount,
            transaction_id = ?entry.transaction_id,
            reference_id = ?entry.reference_id,
            status = ?entry.status,
            metadata = %serde_json::Value::Object(entry.metadata.clone()),
            "payment {}",
            entry.entry_type.as_str()
        );

        match tokio::time::timeout(self.settings.write_timeout, self.store.append(&entry)).await {
            Ok(Ok(())) => AuditWrite::Persisted,
            Ok(Err(e)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    channel = %self.settings.channel,
                    gateway = %entry.gateway_name,
                    error = %e,
                    "failed to save payment transaction"
                );
                AuditWrite::Failed(e.to_string())
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    channel = %self.settings.channel,
                    gateway = %entry.gateway_name,
                    timeout_ms = self.settings.write_timeout.as_millis() as u64,
                    "payment transaction write timed out"
                );
                AuditWrite::TimedOut
            }
        }
    }
}
