//! Paystack webhook integration tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use serde_json::{json, Value};

use accmart_core::UserId;
use common::{bearer, paystack_signature, TestHarness};

fn signature_header() -> HeaderName {
    HeaderName::from_static("x-paystack-signature")
}

async fn initialize(harness: &TestHarness, user_id: &UserId, amount: i64) -> String {
    let body: Value = harness
        .server
        .post("/v1/deposits/initialize")
        .add_header(AUTHORIZATION, bearer(user_id))
        .json(&json!({ "amount": amount }))
        .await
        .json();
    body["reference"].as_str().unwrap().to_string()
}

fn charge_success(reference: &str, amount_minor: i64) -> String {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": amount_minor,
            "status": "success",
            "currency": "NGN"
        }
    })
    .to_string()
}

fn signed(body: &str) -> HeaderValue {
    HeaderValue::from_str(&paystack_signature(body)).unwrap()
}

#[tokio::test]
async fn signed_charge_credits_once() {
    let harness = TestHarness::new().await;
    let user = harness.seed_user("payer@example.com", 0, false).await;
    let reference = initialize(&harness, &user.id, 1000).await;
    let body = charge_success(&reference, 100_000);

    // Paystack redelivers; the second delivery is acknowledged without a credit.
    for _ in 0..2 {
        let response = harness
            .server
            .post("/webhooks/paystack")
            .add_header(signature_header(), signed(&body))
            .text(body.clone())
            .await;

        response.assert_status_ok();
        let ack: Value = response.json();
        assert_eq!(ack["received"], true);
    }

    assert_eq!(harness.balance(&user.id).await, 1000);
}

#[tokio::test]
async fn webhook_then_verify_reports_already_processed() {
    let harness = TestHarness::new().await;
    let user = harness.seed_user("payer@example.com", 0, false).await;
    let reference = initialize(&harness, &user.id, 1000).await;
    harness.mock_verification(&reference, "success", 100_000).await;
    let body = charge_success(&reference, 100_000);

    harness
        .server
        .post("/webhooks/paystack")
        .add_header(signature_header(), signed(&body))
        .text(body)
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/deposits/verify")
        .add_header(AUTHORIZATION, bearer(&user.id))
        .json(&json!({ "reference": reference, "amount": 1000 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["message"], "Deposit already processed");
    assert_eq!(harness.balance(&user.id).await, 1000);
}

#[tokio::test]
async fn invalid_signature_is_rejected() {
    let harness = TestHarness::new().await;
    let user = harness.seed_user("payer@example.com", 0, false).await;
    let reference = initialize(&harness, &user.id, 1000).await;
    let body = charge_success(&reference, 100_000);
    let forged = charge_success(&reference, 100_000).replace("100000", "900000");

    let response = harness
        .server
        .post("/webhooks/paystack")
        .add_header(signature_header(), signed(&body))
        .text(forged)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(harness.balance(&user.id).await, 0);
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let harness = TestHarness::new().await;
    let body = charge_success("dep_unknown", 100_000);

    let response = harness.server.post("/webhooks/paystack").text(body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["message"], "Missing Paystack signature");
}

#[tokio::test]
async fn wrong_amount_is_acknowledged_but_not_credited() {
    let harness = TestHarness::new().await;
    let user = harness.seed_user("payer@example.com", 0, false).await;
    let reference = initialize(&harness, &user.id, 1000).await;
    let body = charge_success(&reference, 10_000);

    harness
        .server
        .post("/webhooks/paystack")
        .add_header(signature_header(), signed(&body))
        .text(body)
        .await
        .assert_status_ok();

    assert_eq!(harness.balance(&user.id).await, 0);
}

#[tokio::test]
async fn unknown_reference_and_other_events_are_acknowledged() {
    let harness = TestHarness::new().await;

    let body = charge_success("dep_nobody", 100_000);
    harness
        .server
        .post("/webhooks/paystack")
        .add_header(signature_header(), signed(&body))
        .text(body)
        .await
        .assert_status_ok();

    let body = json!({
        "event": "transfer.success",
        "data": { "reference": "trf_1", "amount": 5000 }
    })
    .to_string();
    harness
        .server
        .post("/webhooks/paystack")
        .add_header(signature_header(), signed(&body))
        .text(body)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn events_without_charge_fields_are_acknowledged() {
    let harness = TestHarness::new().await;
    let user = harness.seed_user("payer@example.com", 0, false).await;

    let body = json!({
        "event": "customeridentification.success",
        "data": {
            "customer_id": 82_796_315,
            "customer_code": "CUS_XXXXXXXX",
            "email": "payer@example.com",
            "identification": { "country": "NG", "type": "bank_account" }
        }
    })
    .to_string();
    let response = harness
        .server
        .post("/webhooks/paystack")
        .add_header(signature_header(), signed(&body))
        .text(body)
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["received"], true);

    let body = json!({ "event": "charge.success", "data": { "status": "success" } }).to_string();
    harness
        .server
        .post("/webhooks/paystack")
        .add_header(signature_header(), signed(&body))
        .text(body)
        .await
        .assert_status_ok();

    assert_eq!(harness.balance(&user.id).await, 0);
}
