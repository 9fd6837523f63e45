mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use payment_service::models::PaymentStatus;
use serde_json::json;
use uuid::Uuid;

async fn submit_pending_payment(app: &TestApp, user_id: Uuid, months: i32) -> Uuid {
    let response = app
        .api_client
        .post(format!("{}/api/payments/submit-tx", app.address))
        .json(&json!({
            "userId": user_id,
            "durationMonths": months,
            "amountUsd": "60",
            "txId": format!("tx-{}", Uuid::new_v4())
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    body["paymentId"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn approval_activates_subscription_with_thirty_day_months() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();
    let payment_id = submit_pending_payment(&app, user_id, 6).await;

    let response = app
        .api_client
        .post(format!("{}/api/process-payment", app.address))
        .json(&json!({
            "action": "PROCESS",
            "requestId": payment_id,
            "userId": user_id,
            "status": "Approved",
            "months": 6
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["success"], true);

    let profile = app
        .db
        .get_profile(user_id)
        .await
        .expect("query failed")
        .expect("profile missing");
    assert_eq!(profile.subscription_status.as_deref(), Some("Active"));

    // 6 months at a fixed 30 days each
    let expiry = profile.subscription_expiry_date.expect("expiry missing");
    let expected = Utc::now() + Duration::days(180);
    assert!((expiry - expected).num_minutes().abs() < 5);

    let payment = app
        .db
        .get_payment(payment_id)
        .await
        .expect("query failed")
        .expect("payment missing");
    assert_eq!(payment.status, PaymentStatus::Succeeded.as_str());

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn rejection_fails_payment_and_leaves_profile_untouched() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();
    let payment_id = submit_pending_payment(&app, user_id, 3).await;

    let response = app
        .api_client
        .post(format!("{}/api/process-payment", app.address))
        .json(&json!({
            "action": "PROCESS",
            "requestId": payment_id,
            "userId": user_id,
            "status": "Rejected",
            "months": 3
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let payment = app
        .db
        .get_payment(payment_id)
        .await
        .expect("query failed")
        .expect("payment missing");
    assert_eq!(payment.status, PaymentStatus::Failed.as_str());

    assert!(app
        .db
        .get_profile(user_id)
        .await
        .expect("query failed")
        .is_none());
    assert!(app
        .db
        .get_active_subscription(user_id)
        .await
        .expect("query failed")
        .is_none());

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn double_approval_does_not_extend_expiry_twice() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();
    let payment_id = submit_pending_payment(&app, user_id, 6).await;

    let approve = json!({
        "action": "PROCESS",
        "requestId": payment_id,
        "userId": user_id,
        "status": "Approved",
        "months": 6
    });

    let first = app
        .api_client
        .post(format!("{}/api/process-payment", app.address))
        .json(&approve)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(first.status().is_success());

    let expiry_after_first = app
        .db
        .get_profile(user_id)
        .await
        .expect("query failed")
        .expect("profile missing")
        .subscription_expiry_date
        .expect("expiry missing");

    // A second click on approve must be a no-op.
    let second = app
        .api_client
        .post(format!("{}/api/process-payment", app.address))
        .json(&approve)
        .send()
        .await
        .expect("Failed to execute request");
    assert!(second.status().is_success());

    let expiry_after_second = app
        .db
        .get_profile(user_id)
        .await
        .expect("query failed")
        .expect("profile missing")
        .subscription_expiry_date
        .expect("expiry missing");

    assert_eq!(expiry_after_first, expiry_after_second);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn rejected_payment_cannot_be_approved_afterwards() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();
    let payment_id = submit_pending_payment(&app, user_id, 3).await;

    let reject = app
        .api_client
        .post(format!("{}/api/process-payment", app.address))
        .json(&json!({
            "action": "PROCESS",
            "requestId": payment_id,
            "userId": user_id,
            "status": "Rejected",
            "months": 3
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(reject.status().is_success());

    let approve = app
        .api_client
        .post(format!("{}/api/process-payment", app.address))
        .json(&json!({
            "action": "PROCESS",
            "requestId": payment_id,
            "userId": user_id,
            "status": "Approved",
            "months": 3
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(approve.status().is_success());

    // The terminal state wins; no retroactive activation.
    let payment = app
        .db
        .get_payment(payment_id)
        .await
        .expect("query failed")
        .expect("payment missing");
    assert_eq!(payment.status, PaymentStatus::Failed.as_str());
    assert!(app
        .db
        .get_active_subscription(user_id)
        .await
        .expect("query failed")
        .is_none());

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn mismatched_user_is_rejected() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();
    let payment_id = submit_pending_payment(&app, user_id, 3).await;

    let response = app
        .api_client
        .post(format!("{}/api/process-payment", app.address))
        .json(&json!({
            "action": "PROCESS",
            "requestId": payment_id,
            "userId": Uuid::new_v4(),
            "status": "Approved",
            "months": 3
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}
