use crate::domain::audit::{AuditEntry, AuditFilter, AuditType, StatusScope};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::sync::Arc;
use tokio::sync::RwLock;

const SUCCESS_STATUSES: &[&str] = &["COMPLETED", "succeeded", "captured", "settled"];
const FAILURE_STATUSES: &[&str] = &["FAILED", "failed", "declined", "error"];

/// Append-only sink for audit entries. `list` exists for reporting tools.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<()>;

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>>;
}

#[derive(Clone)]
pub struct AuditRepo {
    pub pool: PgPool,
}

#[async_trait]
impl AuditStore for AuditRepo {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                type, gateway, amount, transaction_id, reference_id, status, metadata
            ) VALUES ($1,$2,$3,$4,$5,$6,$7)
            "#,
        )
        .bind(entry.entry_type.as_str())
        .bind(&entry.gateway_name)
        .bind(entry.amount)
        .bind(&entry.transaction_id)
        .bind(&entry.reference_id)
        .bind(&entry.status)
        .bind(serde_json::Value::Object(entry.metadata.clone()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT type, gateway, amount, transaction_id, reference_id, status, metadata FROM payment_transactions WHERE true",
        );
        if let Some(gateway) = &filter.gateway_name {
            qb.push(" AND gateway = ").push_bind(gateway.clone());
        }
        if let Some(t) = filter.entry_type {
            qb.push(" AND type = ").push_bind(t.as_str());
        }
        if let Some(scope) = filter.status_scope {
            let statuses = match scope {
                StatusScope::Successful => SUCCESS_STATUSES,
                StatusScope::Failed => FAILURE_STATUSES,
            };
            qb.push(" AND status = ANY(")
                .push_bind(statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>())
                .push(")");
        }
        qb.push(" ORDER BY id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                let entry_type = match row.get::<String, _>("type").as_str() {
                    "charge" => AuditType::Charge,
                    "refund" => AuditType::Refund,
                    "webhook" => AuditType::Webhook,
                    other => anyhow::bail!("unknown audit type {other}"),
                };
                let metadata = match row.get::<serde_json::Value, _>("metadata") {
                    serde_json::Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                Ok(AuditEntry {
                    entry_type,
                    gateway_name: row.get("gateway"),
                    amount: row.get("amount"),
                    transaction_id: row.get("transaction_id"),
                    reference_id: row.get("reference_id"),
                    status: row.get("status"),
                    metadata,
                })
            })
            .collect()
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAuditStore {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| filter.matches(e)).cloned().collect())
    }
}
