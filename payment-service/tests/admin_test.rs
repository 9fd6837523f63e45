mod common;

use common::TestApp;
use payment_service::models::PaymentStatus;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn review_queue_lists_payments_awaiting_decision() {
    let app = TestApp::spawn().await;

    for _ in 0..2 {
        let response = app
            .api_client
            .post(format!("{}/api/payments/manual-receipt", app.address))
            .json(&json!({
                "userId": Uuid::new_v4(),
                "durationMonths": 1,
                "amountUsd": "10",
                "receiptUrl": "https://cdn.example.com/receipts/r.png"
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
    }

    let response = app
        .api_client
        .get(format!("{}/api/admin/payments", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let queue: Vec<serde_json::Value> = response.json().await.expect("Invalid JSON");
    assert_eq!(queue.len(), 2);
    assert!(queue.iter().all(|p| p["status"] == "pending"));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn operator_approval_activates_subscription() {
    let app = TestApp::spawn().await;
    let user_id = Uuid::new_v4();

    let response = app
        .api_client
        .post(format!("{}/api/payments/manual-receipt", app.address))
        .json(&json!({
            "userId": user_id,
            "durationMonths": 6,
            "amountUsd": "60",
            "receiptUrl": "https://cdn.example.com/receipts/r.png"
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
        .json(&json!({ "outcome": "Approved", "months": 6 }))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["success"], true);

    let payment = app
        .db
        .get_payment(payment_id)
        .await
        .expect("query failed")
        .expect("payment missing");
    assert_eq!(payment.status, PaymentStatus::Succeeded.as_str());

    let profile = app
        .db
        .get_profile(user_id)
        .await
        .expect("query failed")
        .expect("profile missing");
    assert_eq!(profile.subscription_status.as_deref(), Some("Active"));

    // Settled payments leave the queue.
    let queue = app.db.list_review_queue().await.expect("query failed");
    assert!(queue.is_empty());

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running Postgres (set TEST_DATABASE_URL)"]
async fn reviewing_unknown_payment_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .api_client
        .post(format!(
            "{}/api/admin/payments/{}/review",
            app.address,
            Uuid::new_v4()
        ))
        .json(&json!({ "outcome": "Rejected", "months": 1 }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}
