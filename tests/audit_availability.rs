use async_trait::async_trait;
use payment_dispatch::config::GatewaySettings;
use payment_dispatch::domain::audit::{AuditEntry, AuditFilter};
use payment_dispatch::domain::payment::{Metadata, PaymentData};
use payment_dispatch::gateways::mock::MockGateway;
use payment_dispatch::gateways::signature::compute_hmac_hex;
use payment_dispatch::gateways::PaymentGateway;
use payment_dispatch::repo::audit_repo::AuditStore;
use payment_dispatch::service::audit_logger::{AuditLogger, AuditSettings};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct DownStore;

#[async_trait]
impl AuditStore for DownStore {
    async fn append(&self, _entry: &AuditEntry) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }

    async fn list(&self, _filter: &AuditFilter) -> anyhow::Result<Vec<AuditEntry>> {
        anyhow::bail!("connection refused")
    }
}

struct HangingStore;

#[async_trait]
impl AuditStore for HangingStore {
    async fn append(&self, _entry: &AuditEntry) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn list(&self, _filter: &AuditFilter) -> anyhow::Result<Vec<AuditEntry>> {
        Ok(Vec::new())
    }
}

fn mock_over(store: Arc<dyn AuditStore>, write_timeout: Duration) -> (MockGateway, Arc<AuditLogger>) {
    let audit = Arc::new(AuditLogger::new(
        AuditSettings {
            write_timeout,
            ..AuditSettings::default()
        },
        store,
    ));
    let settings = GatewaySettings {
        webhook_secret: Some("whsec_mock".to_string()),
        ..GatewaySettings::default()
    };
    (MockGateway::new("mock", &settings, audit.clone()), audit)
}

#[tokio::test]
async fn broken_store_does_not_change_results() {
    let (gw, audit) = mock_over(Arc::new(DownStore), Duration::from_secs(2));

    let charged = gw.charge(dec!(42.00), &PaymentData::default(), &Metadata::new()).await;
    assert!(charged.success, "{charged:?}");
    let id = charged.transaction_id.unwrap();

    let refunded = gw.refund(&id, None).await;
    assert!(refunded.success, "{refunded:?}");

    let body = format!(
        r#"{{"id":"evt_1","type":"charge.succeeded","data":{{"object":{{"id":"{id}","amount":"42.00","status":"COMPLETED"}}}}}}"#
    );
    let sig = compute_hmac_hex(b"whsec_mock", &[body.as_bytes()]);
    let hooked = gw.handle_webhook(body.as_bytes(), Some(&sig)).await;
    assert!(hooked.success, "{hooked:?}");
    assert_eq!(hooked.event_type.as_deref(), Some("charge.succeeded"));

    assert_eq!(audit.failures(), 3);
}

#[tokio::test]
async fn slow_store_is_cut_off() {
    let (gw, audit) = mock_over(Arc::new(HangingStore), Duration::from_millis(50));

    let started = Instant::now();
    let charged = gw.charge(dec!(1.00), &PaymentData::default(), &Metadata::new()).await;

    assert!(charged.success);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(audit.failures(), 1);
}

#[tokio::test]
async fn disabled_logging_skips_the_store() {
    let audit = Arc::new(AuditLogger::new(
        AuditSettings {
            enabled: false,
            ..AuditSettings::default()
        },
        Arc::new(DownStore),
    ));
    let settings = GatewaySettings {
        webhook_secret: Some("whsec_mock".to_string()),
        ..GatewaySettings::default()
    };
    let gw = MockGateway::new("mock", &settings, audit.clone());

    assert!(gw.charge(dec!(3), &PaymentData::default(), &Metadata::new()).await.success);
    assert_eq!(audit.failures(), 0);
}
