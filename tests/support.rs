mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, Wallet, order_body};
use serde_json::{Value, json};

async fn open_ticket(app: &TestApp, token: &str, body: Value) -> (StatusCode, Value) {
    app.request(Method::POST, "/api/support", Some(token), Some(body))
        .await
}

#[tokio::test]
async fn admin_moves_ticket_through_its_statuses() {
    let app = TestApp::new();
    let user = app.sign_in(&Wallet::from_seed(50)).await;
    let admin = app.sign_in_admin(&Wallet::from_seed(51)).await;

    let (status, created) = open_ticket(
        &app,
        &user,
        json!({ "subject": "Wrong flavour", "description": "Got mint instead of classic" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["data"]["status"], "open");
    assert_eq!(created["data"]["priority"], "medium");

    let uri = format!("/api/support/{}/status", created["data"]["id"].as_str().unwrap());

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&admin),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in_progress");

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&admin),
            Some(json!({ "status": "resolved", "adminResponse": "Refund issued" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "resolved");
    assert_eq!(body["data"]["adminResponse"], "Refund issued");
}

#[tokio::test]
async fn non_admins_cannot_change_status() {
    let app = TestApp::new();
    let user = app.sign_in(&Wallet::from_seed(52)).await;

    let (_, created) = open_ticket(
        &app,
        &user,
        json!({ "subject": "Late", "description": "Still waiting", "priority": "high" }),
    )
    .await;
    assert_eq!(created["data"]["priority"], "high");
    let uri = format!("/api/support/{}/status", created["data"]["id"].as_str().unwrap());

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&user),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn comment_threads_are_shared_by_owner_and_admin() {
    let app = TestApp::new();
    let user = app.sign_in(&Wallet::from_seed(53)).await;
    let admin = app.sign_in_admin(&Wallet::from_seed(54)).await;
    let stranger = app.sign_in(&Wallet::from_seed(55)).await;

    let (_, created) = open_ticket(
        &app,
        &user,
        json!({ "subject": "Receipt", "description": "Need an invoice" }),
    )
    .await;
    let uri = format!("/api/support/{}/comments", created["data"]["id"].as_str().unwrap());

    let (status, body) = app
        .request(Method::POST, &uri, Some(&user), Some(json!({ "comment": "Any update?" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["isAdmin"], false);

    let (status, body) = app
        .request(Method::POST, &uri, Some(&admin), Some(json!({ "comment": "Sent by mail" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["isAdmin"], true);

    let (status, _) = app
        .request(Method::POST, &uri, Some(&stranger), Some(json!({ "comment": "Hi" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, thread) = app.request(Method::GET, &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["data"].as_array().unwrap().len(), 2);

    let (status, _) = app.request(Method::GET, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tickets_validate_their_fields() {
    let app = TestApp::new();
    let user = app.sign_in(&Wallet::from_seed(56)).await;

    let (status, body) = open_ticket(
        &app,
        &user,
        json!({ "subject": "   ", "description": "Something" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["path"], "subject");

    let (status, _) = open_ticket(
        &app,
        &user,
        json!({ "subject": "Hi", "description": "x".repeat(5_001) }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tickets_may_only_reference_own_orders() {
    let app = TestApp::new();
    let owner = app.sign_in(&Wallet::from_seed(57)).await;
    let other = app.sign_in(&Wallet::from_seed(58)).await;

    let (_, order) = app
        .request(Method::POST, "/api/orders", Some(&owner), Some(order_body()))
        .await;
    let order_id = order["data"]["id"].clone();

    let (status, _) = open_ticket(
        &app,
        &other,
        json!({ "subject": "Mine?", "description": "Not mine", "orderId": order_id }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = open_ticket(
        &app,
        &owner,
        json!({ "subject": "Missing cup", "description": "One short", "orderId": order_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["orderId"], order_id);

    let (_, mine) = app
        .request(Method::GET, "/api/support/user", Some(&owner), None)
        .await;
    assert_eq!(mine["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_dashboard_is_admin_only() {
    let app = TestApp::new();
    let user_wallet = Wallet::from_seed(59);
    let user = app.sign_in(&user_wallet).await;
    let admin = app.sign_in_admin(&Wallet::from_seed(60)).await;
    app.seed_completed_orders(&user_wallet.address, 2).await;
    open_ticket(
        &app,
        &user,
        json!({ "subject": "Hello", "description": "Just saying hi" }),
    )
    .await;

    let (status, _) = app
        .request(Method::GET, "/api/admin/stats", Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, stats) = app
        .request(Method::GET, "/api/admin/stats", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["totalOrders"], 2);
    assert_eq!(stats["data"]["totalRevenue"].as_f64(), Some(7.98));
    assert_eq!(stats["data"]["activeCustomers"], 1);
    assert_eq!(stats["data"]["nftsMinted"], 0);

    let (_, orders) = app
        .request(Method::GET, "/api/admin/orders", Some(&admin), None)
        .await;
    assert_eq!(orders["data"].as_array().unwrap().len(), 2);

    let (_, tickets) = app
        .request(Method::GET, "/api/admin/support", Some(&admin), None)
        .await;
    assert_eq!(tickets["data"].as_array().unwrap().len(), 1);
}
