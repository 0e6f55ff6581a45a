use mockito::Matcher;
use payment_dispatch::config::GatewaySettings;
use payment_dispatch::domain::audit::AuditType;
use payment_dispatch::domain::payment::{Metadata, PaymentData, PaymentStatus};
use payment_dispatch::gateways::razorpay::RazorpayGateway;
use payment_dispatch::gateways::signature::compute_hmac_hex;
use payment_dispatch::gateways::PaymentGateway;
use payment_dispatch::repo::audit_repo::InMemoryAuditStore;
use payment_dispatch::service::audit_logger::{AuditLogger, AuditSettings};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;

const WEBHOOK_SECRET: &str = "rzp_whsec";

fn razorpay(base_url: &str) -> (RazorpayGateway, InMemoryAuditStore) {
    let store = InMemoryAuditStore::new();
    let audit = Arc::new(AuditLogger::new(AuditSettings::default(), Arc::new(store.clone())));
    let settings = GatewaySettings {
        secret_key: "rzp_secret".to_string(),
        publishable_key: Some("rzp_test_key".to_string()),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        base_url: Some(base_url.to_string()),
        currency: "inr".to_string(),
        ..GatewaySettings::default()
    };
    (RazorpayGateway::new("razorpay", &settings, reqwest::Client::new(), audit), store)
}

#[tokio::test]
async fn capture_uses_basic_auth_and_paise() {
    let mut server = mockito::Server::new_async().await;
    let capture = server
        .mock("POST", "/v1/payments/pay_1/capture")
        .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
        .match_body(Matcher::PartialJson(json!({
            "amount": 50000,
            "currency": "INR",
            "notes": {"order_id": "ord_1"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"pay_1","status":"captured","amount":50000,"currency":"INR"}"#)
        .expect(1)
        .create_async()
        .await;

    let (gw, store) = razorpay(&server.url());
    let payment_data = PaymentData {
        payment_method_id: Some("pay_1".to_string()),
        ..PaymentData::default()
    };
    let mut metadata = Metadata::new();
    metadata.insert("order_id".to_string(), "ord_1".to_string());

    let r = gw.charge(dec!(500), &payment_data, &metadata).await;

    assert!(r.success, "{r:?}");
    assert_eq!(r.normalized_status, Some(PaymentStatus::Succeeded));
    capture.assert_async().await;
    let entries = store.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reference_id.as_deref(), Some("ord_1"));
    assert_eq!(entries[0].status.as_deref(), Some("captured"));
}

#[tokio::test]
async fn charge_without_payment_id_never_calls_vendor() {
    let mut server = mockito::Server::new_async().await;
    let any = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (gw, store) = razorpay(&server.url());
    let r = gw.charge(dec!(1), &PaymentData::default(), &Metadata::new()).await;

    assert!(!r.success);
    assert_eq!(r.error_code.as_deref(), Some("BAD_REQUEST_ERROR"));
    any.assert_async().await;
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn full_and_partial_refund_bodies_differ() {
    let mut server = mockito::Server::new_async().await;
    let full = server
        .mock("POST", "/v1/payments/pay_1/refund")
        .match_body(Matcher::Json(json!({})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"rfnd_full","status":"processed"}"#)
        .expect(1)
        .create_async()
        .await;
    let partial = server
        .mock("POST", "/v1/payments/pay_2/refund")
        .match_body(Matcher::Json(json!({"amount": 1000})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"rfnd_part","status":"processed"}"#)
        .expect(1)
        .create_async()
        .await;

    let (gw, store) = razorpay(&server.url());
    assert!(gw.refund("pay_1", None).await.success);
    assert!(gw.refund("pay_2", Some(dec!(10.00))).await.success);

    full.assert_async().await;
    partial.assert_async().await;
    let entries = store.entries().await;
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.entry_type == AuditType::Refund));
}

#[tokio::test]
async fn refund_of_unknown_payment_keeps_vendor_description() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/payments/pay_missing/refund")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"The id provided does not exist","reason":"input_validation_failed"}}"#,
        )
        .create_async()
        .await;

    let (gw, store) = razorpay(&server.url());
    let r = gw.refund("pay_missing", None).await;

    assert!(!r.success);
    assert_eq!(r.error.as_deref(), Some("The id provided does not exist"));
    assert_eq!(r.error_code.as_deref(), Some("BAD_REQUEST_ERROR"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn order_becomes_intent() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/orders")
        .match_body(Matcher::PartialJson(json!({"amount": 129900, "receipt": "ord_5"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"order_abc","amount":129900,"currency":"INR","status":"created"}"#)
        .create_async()
        .await;

    let (gw, _store) = razorpay(&server.url());
    let mut metadata = Metadata::new();
    metadata.insert("order_id".to_string(), "ord_5".to_string());
    let r = gw.create_intent(dec!(1299), &metadata).await;

    assert!(r.success, "{r:?}");
    assert_eq!(r.intent_id.as_deref(), Some("order_abc"));
    assert_eq!(r.client_secret.as_deref(), Some("order_abc"));
    assert_eq!(r.publishable_key.as_deref(), Some("rzp_test_key"));
}

#[tokio::test]
async fn status_converts_paise_back() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/payments/pay_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"pay_1","status":"authorized","amount":19999,"currency":"INR"}"#)
        .create_async()
        .await;

    let (gw, _store) = razorpay(&server.url());
    let r = gw.get_status("pay_1").await;

    assert!(r.success);
    assert_eq!(r.amount, Some(dec!(199.99)));
    assert_eq!(r.normalized_status, Some(PaymentStatus::RequiresAction));
}

#[tokio::test]
async fn captured_webhook_is_verified_and_audited() {
    let (gw, store) = razorpay("http://127.0.0.1:9");
    let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_1","status":"captured","amount":50000,"currency":"INR"}}}}"#;
    let sig = compute_hmac_hex(WEBHOOK_SECRET.as_bytes(), &[body]);

    let r = gw.handle_webhook(body, Some(&sig)).await;

    assert!(r.success, "{r:?}");
    let entries = store.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].transaction_id.as_deref(), Some("pay_1"));
    assert_eq!(entries[0].amount, Some(dec!(500)));
    assert_eq!(entries[0].status.as_deref(), Some("succeeded"));
}

#[tokio::test]
async fn wrong_secret_is_rejected() {
    let (gw, store) = razorpay("http://127.0.0.1:9");
    let body = br#"{"event":"payment.failed","payload":{"payment":{"entity":{"id":"pay_1","amount":100}}}}"#;
    let sig = compute_hmac_hex(b"someone_else", &[body]);

    let r = gw.handle_webhook(body, Some(&sig)).await;

    assert_eq!(r.error.as_deref(), Some("Invalid signature"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn payment_id_cannot_redirect_capture_to_refund() {
    let mut server = mockito::Server::new_async().await;
    let refund = server
        .mock("POST", "/v1/payments/pay_1/refund")
        .expect(0)
        .create_async()
        .await;
    let capture = server
        .mock("POST", Matcher::Regex(r"^/v1/payments/pay_1%2Frefund%23/capture$".to_string()))
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"The id provided does not exist"}}"#)
        .expect(1)
        .create_async()
        .await;

    let (gw, store) = razorpay(&server.url());
    let payment_data = PaymentData {
        payment_method_id: Some("pay_1/refund#".to_string()),
        ..PaymentData::default()
    };
    let r = gw.charge(dec!(10), &payment_data, &Metadata::new()).await;

    assert!(!r.success);
    assert_eq!(r.error.as_deref(), Some("The id provided does not exist"));
    refund.assert_async().await;
    capture.assert_async().await;
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn transaction_id_stays_inside_refund_path() {
    let mut server = mockito::Server::new_async().await;
    let capture = server
        .mock("POST", Matcher::Regex(r"^/v1/payments/pay_1/capture".to_string()))
        .expect(0)
        .create_async()
        .await;
    let refund = server
        .mock("POST", Matcher::Regex(r"^/v1/payments/pay_1%2Fcapture%3Fx=1/refund$".to_string()))
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"The requested URL was not found on the server."}}"#)
        .expect(1)
        .create_async()
        .await;

    let (gw, store) = razorpay(&server.url());
    let r = gw.refund("pay_1/capture?x=1", None).await;

    assert!(!r.success);
    capture.assert_async().await;
    refund.assert_async().await;
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn dot_segment_ids_never_reach_the_vendor() {
    let mut server = mockito::Server::new_async().await;
    let any = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (gw, _store) = razorpay(&server.url());
    let r = gw.refund("..", None).await;

    assert!(!r.success);
    assert_eq!(r.error_code.as_deref(), Some("INVALID_REQUEST"));
    any.assert_async().await;
}
