use payment_dispatch::config::{GatewayEntry, GatewayMode, GatewaySettings, PaymentConfig};
use payment_dispatch::gateways::registry::{GatewayDeps, GatewayRegistry, RegistryError};
use payment_dispatch::gateways::PaymentGateway;
use payment_dispatch::repo::audit_repo::InMemoryAuditStore;
use payment_dispatch::service::audit_logger::{AuditLogger, AuditSettings};
use payment_dispatch::service::payment_service::PaymentService;
use std::sync::Arc;

fn deps() -> GatewayDeps {
    GatewayDeps {
        client: reqwest::Client::new(),
        audit: Arc::new(AuditLogger::new(
            AuditSettings::default(),
            Arc::new(InMemoryAuditStore::new()),
        )),
    }
}

fn entry(id: &str, driver: &str) -> GatewayEntry {
    GatewayEntry {
        id: id.to_string(),
        driver: driver.to_string(),
        settings: GatewaySettings {
            webhook_secret: Some(format!("whsec_{id}")),
            ..GatewaySettings::default()
        },
    }
}

fn config(default_gateway: &str, gateways: Vec<GatewayEntry>) -> PaymentConfig {
    PaymentConfig {
        default_gateway: default_gateway.to_string(),
        gateways,
        audit: AuditSettings::default(),
    }
}

fn service() -> PaymentService {
    let cfg = config(
        "stripe",
        vec![entry("stripe", "stripe"), entry("razorpay", "razorpay"), entry("sandbox", "mock")],
    );
    let registry = GatewayRegistry::from_config(&cfg, &deps()).unwrap();
    PaymentService::new(Arc::new(registry))
}

#[test]
fn omitted_name_resolves_to_default() {
    let svc = service();
    assert_eq!(svc.gateway(None).unwrap().name(), "stripe");
    assert_eq!(svc.gateway(Some("sandbox")).unwrap().name(), "sandbox");
}

#[test]
fn every_available_gateway_resolves() {
    let svc = service();
    let names = svc.available_gateways();
    assert_eq!(names, vec!["razorpay", "sandbox", "stripe"]);
    for name in &names {
        assert!(svc.has_gateway(name));
        assert!(svc.gateway(Some(name.as_str())).is_ok());
    }
}

#[test]
fn unknown_names_fail_immediately_and_descriptively() {
    let svc = service();
    for name in ["paypal", "", "Stripe", "stripe "] {
        assert!(!svc.has_gateway(name));
        match svc.gateway(Some(name)) {
            Err(RegistryError::UnsupportedGateway(n)) => assert_eq!(n, name),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("{name:?} should not resolve"),
        }
    }
    let err = svc.gateway(Some("paypal")).err().unwrap();
    assert_eq!(err.to_string(), "Payment gateway [paypal] is not supported.");
}

#[test]
fn info_reports_mode_and_methods() {
    let mut live = entry("stripe", "stripe");
    live.settings.mode = GatewayMode::Live;
    live.settings.secret_key = "sk_live_1".to_string();
    live.settings.payment_methods = vec!["card".to_string(), "sepa_debit".to_string()];
    let cfg = config("stripe", vec![live, entry("sandbox", "mock")]);

    let registry = GatewayRegistry::from_config(&cfg, &deps()).unwrap();
    let stripe = registry.info().iter().find(|i| i.gateway_id == "stripe").unwrap();
    assert_eq!(stripe.mode, "live");
    assert_eq!(stripe.payment_methods, vec!["card", "sepa_debit"]);
    assert!(stripe.is_default);
    let sandbox = registry.info().iter().find(|i| i.gateway_id == "sandbox").unwrap();
    assert_eq!(sandbox.driver, "mock");
    assert!(!sandbox.is_default);
}

#[test]
fn duplicate_identifiers_are_rejected() {
    let cfg = config("stripe", vec![entry("stripe", "stripe"), entry("stripe", "mock")]);
    assert!(matches!(
        GatewayRegistry::from_config(&cfg, &deps()),
        Err(RegistryError::Duplicate(ref id)) if id == "stripe"
    ));
}
