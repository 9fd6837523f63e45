mod common;

use common::TestApp;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn user_without_subscription_is_inactive() {
    let app = TestApp::spawn().await;

    let response = app
        .api_client
        .get(format!(
            "{}/api/subscriptions/status?userId={}",
            app.address,
            Uuid::new_v4()
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["active"], false);
    assert!(body.get("subscription").is_none());

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn pending_subscription_is_not_active() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();

    let response = app
        .api_client
        .post(format!("{}/api/payments/submit-tx", app.address))
        .json(&json!({
            "userId": user_id,
            "durationMonths": 3,
            "amountUsd": "30",
            "txId": "tx-pending"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .api_client
        .get(format!(
            "{}/api/subscriptions/status?userId={}",
            app.address, user_id
        ))
        .send()
        .await
        .expect("Failed to execute request");

    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["active"], false);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn approved_subscription_reports_active_with_details() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();

    let response = app
        .api_client
        .post(format!("{}/api/payments/submit-tx", app.address))
        .json(&json!({
            "userId": user_id,
            "durationMonths": 12,
            "amountUsd": "120",
            "txId": "tx-active"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    let payment_id: Uuid = body["paymentId"].as_str().unwrap().parse().unwrap();

    let response = app
        .api_client
        .post(format!(
            "{}/api/admin/payments/{}/review",
            app.address, payment_id
        ))
        .json(&json!({ "outcome": "Approved", "months": 12 }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let response = app
        .api_client
        .get(format!(
            "{}/api/subscriptions/status?userId={}",
            app.address, user_id
        ))
        .send()
        .await
        .expect("Failed to execute request");

    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["active"], true);
    assert_eq!(body["subscription"]["status"], "active");
    assert_eq!(body["subscription"]["durationMonths"], 12);
    assert!(body["subscription"]["expiryDate"].is_string());

    app.cleanup().await;
}
