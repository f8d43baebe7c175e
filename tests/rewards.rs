mod common;

use std::sync::atomic::Ordering;

use axum::http::{Method, StatusCode};
use common::{TestApp, Wallet};
use serde_json::json;

async fn mint(app: &TestApp, token: &str, tier: &str) -> (StatusCode, serde_json::Value) {
    app.request(
        Method::POST,
        "/api/nft-rewards/mint",
        Some(token),
        Some(json!({ "tier": tier })),
    )
    .await
}

#[tokio::test]
async fn seven_completed_orders_unlock_bronze() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(30);
    let token = app.sign_in(&wallet).await;
    app.seed_completed_orders(&wallet.address, 7).await;

    let (status, body) = app
        .request(Method::GET, "/api/nft-rewards/eligibility", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["eligibleTiers"], json!(["bronze"]));
    assert_eq!(body["data"]["currentCount"], 7);
    assert_eq!(body["data"]["nextTierAt"], 10);
}

#[tokio::test]
async fn bronze_boundary_is_five() {
    let app = TestApp::new();
    let four = Wallet::from_seed(31);
    let five = Wallet::from_seed(32);
    let four_token = app.sign_in(&four).await;
    let five_token = app.sign_in(&five).await;
    app.seed_completed_orders(&four.address, 4).await;
    app.seed_completed_orders(&five.address, 5).await;

    let (_, body) = app
        .request(Method::GET, "/api/nft-rewards/eligibility", Some(&four_token), None)
        .await;
    assert_eq!(body["data"]["eligibleTiers"], json!([]));

    let (_, body) = app
        .request(Method::GET, "/api/nft-rewards/eligibility", Some(&five_token), None)
        .await;
    assert_eq!(body["data"]["eligibleTiers"], json!(["bronze"]));
}

#[tokio::test]
async fn gold_with_three_orders_is_not_eligible() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(33);
    let token = app.sign_in(&wallet).await;
    app.seed_completed_orders(&wallet.address, 3).await;

    let (status, body) = mint(&app, &token, "gold").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(app.minter.calls.load(Ordering::SeqCst), 0);

    let (_, rewards) = app
        .request(Method::GET, "/api/nft-rewards/user", Some(&token), None)
        .await;
    assert!(rewards["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn mints_and_records_the_reward() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(34);
    let token = app.sign_in(&wallet).await;
    app.seed_completed_orders(&wallet.address, 12).await;

    let (status, body) = mint(&app, &token, "silver").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "minted");
    assert_eq!(body["data"]["tier"], "silver");
    assert!(body["data"]["mintAddress"].is_string());

    let documents = app.storage.documents.lock().unwrap().clone();
    assert_eq!(documents[0].image, "https://joeys.test/assets/nft-silver.svg");

    let (_, body) = app
        .request(Method::GET, "/api/nft-rewards/eligibility", Some(&token), None)
        .await;
    assert_eq!(body["data"]["eligibleTiers"], json!(["bronze"]));
    assert_eq!(body["data"]["mintedTiers"], json!(["silver"]));

    let (status, _) = mint(&app, &token, "silver").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_mints_produce_one_token() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(35);
    let token = app.sign_in(&wallet).await;
    app.seed_completed_orders(&wallet.address, 5).await;

    let (first, second) = tokio::join!(
        mint(&app, &token, "bronze"),
        mint(&app, &token, "bronze")
    );

    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    assert_eq!(app.minter.calls.load(Ordering::SeqCst), 1);

    let (_, rewards) = app
        .request(Method::GET, "/api/nft-rewards/user", Some(&token), None)
        .await;
    let minted: Vec<_> = rewards["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|reward| reward["status"] == "minted")
        .collect();
    assert_eq!(minted.len(), 1);
}

#[tokio::test]
async fn flaky_uploads_are_retried() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(36);
    let token = app.sign_in(&wallet).await;
    app.seed_completed_orders(&wallet.address, 5).await;
    app.storage.failures_left.store(2, Ordering::SeqCst);

    let (status, _) = mint(&app, &token, "bronze").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.storage.uploads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_uploads_leave_a_failed_row_and_skip_minting() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(39);
    let token = app.sign_in(&wallet).await;
    app.seed_completed_orders(&wallet.address, 5).await;
    app.storage.failures_left.store(5, Ordering::SeqCst);

    let (status, body) = mint(&app, &token, "bronze").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(app.storage.uploads.load(Ordering::SeqCst), 3);
    assert_eq!(app.minter.calls.load(Ordering::SeqCst), 0);

    let (_, rewards) = app
        .request(Method::GET, "/api/nft-rewards/user", Some(&token), None)
        .await;
    let reward = &rewards["data"][0];
    assert_eq!(reward["status"], "failed");
    assert!(reward["metadataUri"].is_null());
    assert!(reward["mintAddress"].is_null());
    assert!(
        reward["failureReason"]
            .as_str()
            .unwrap()
            .contains("storage node unavailable")
    );

    app.storage.failures_left.store(0, Ordering::SeqCst);
    let (status, body) = mint(&app, &token, "bronze").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(app.minter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_mints_leave_a_failed_row_and_free_the_tier() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(37);
    let token = app.sign_in(&wallet).await;
    app.seed_completed_orders(&wallet.address, 5).await;
    app.minter.fail.store(true, Ordering::SeqCst);

    let (status, body) = mint(&app, &token, "bronze").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(app.minter.calls.load(Ordering::SeqCst), 1);

    let (_, rewards) = app
        .request(Method::GET, "/api/nft-rewards/user", Some(&token), None)
        .await;
    let reward = &rewards["data"][0];
    assert_eq!(reward["status"], "failed");
    assert!(reward["metadataUri"].is_string());
    assert!(reward["failureReason"].as_str().unwrap().contains("minter rejected"));

    app.minter.fail.store(false, Ordering::SeqCst);
    let (status, _) = mint(&app, &token, "bronze").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn legacy_tier_names_are_accepted() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(38);
    let token = app.sign_in(&wallet).await;
    app.seed_completed_orders(&wallet.address, 5).await;

    let (status, body) = mint(&app, &token, "purchase_count_bronze").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["tier"], "bronze");
}
