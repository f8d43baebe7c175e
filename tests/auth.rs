mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, Wallet};
use serde_json::json;

#[tokio::test]
async fn signed_challenge_opens_a_session() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(70);

    let token = app.sign_in(&wallet).await;

    let (status, _) = app
        .request_with(
            Method::GET,
            "/api/orders/user",
            Some(&token),
            &[("wallet-address", wallet.address.as_str())],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_signer_is_rejected() {
    let app = TestApp::new();
    let wallet = Wallet::from_seed(71);
    let impostor = Wallet::from_seed(72);

    let (_, challenge) = app
        .request(
            Method::POST,
            "/api/auth/challenge",
            None,
            Some(json!({ "walletAddress": wallet.address.as_str() })),
        )
        .await;
    let message = challenge["data"]["message"].as_str().unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/verify",
            None,
            Some(json!({
                "walletAddress": wallet.address.as_str(),
                "nonce": challenge["data"]["nonce"],
                "signature": impostor.sign(message),
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn invalid_wallet_addresses_are_validation_errors() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/challenge",
            None,
            Some(json!({ "walletAddress": "0xdeadbeef" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn public_routes_need_no_session() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.request(Method::GET, "/api/menu", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_array());

    let (status, _) = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
