// ============================================================================
// Pipeline Tests
// ============================================================================
//
// Authentication short-circuiting, the public allow-list, local endpoints,
// the login flow and the failure envelope shape.
//
// ============================================================================

use serde_json::{json, Value};

use test_utils::{
    assert_failure_envelope, spawn_gateway, spawn_upstream, test_config, TEST_ADMIN_PASSWORD,
};

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;

    let response = reqwest::get(format!("{}/api/core/items", gateway.url))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.unwrap();
    assert_failure_envelope(&body, 401);
}

#[tokio::test]
async fn malformed_authorization_header_is_401() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/core/items", gateway.url))
        .header("Authorization", "Token abc123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_failure_envelope(&response.json().await.unwrap(), 401);
}

#[tokio::test]
async fn garbage_token_is_401() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/core/items", gateway.url))
        .bearer_auth("definitely.not.ajwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_failure_envelope(&response.json().await.unwrap(), 401);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_401() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;

    // A structurally valid token from a different deployment
    let mut foreign_config = test_config(&upstream.url, 1000, 60);
    foreign_config.jwt_secret = "a-completely-different-secret-value".to_string();
    let foreign_auth = portico::auth::AuthManager::new(&foreign_config);
    let (foreign_token, _) = foreign_auth.create_token("intruder").unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/core/items", gateway.url))
        .bearer_auth(foreign_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn health_endpoints_skip_authentication() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;

    let response = reqwest::get(format!("{}/", gateway.url)).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["error"], Value::Null);

    let response = reqwest::get(format!("{}/health", gateway.url)).await.unwrap();
    assert_eq!(response.status(), 200);

    // Upstream probe against the live stub
    let response = reqwest::get(format!("{}/health/user", gateway.url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn unknown_service_probe_is_404() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;

    let response = reqwest::get(format!("{}/health/billing", gateway.url))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert_failure_envelope(&response.json().await.unwrap(), 404);
}

#[tokio::test]
async fn unrouted_path_is_404_envelope() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;
    let token = gateway.token_for("someone");

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/billing/invoices", gateway.url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert_failure_envelope(&response.json().await.unwrap(), 404);
}

#[tokio::test]
async fn login_issues_a_working_token() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/auth/login", gateway.url))
        .json(&json!({"username": "admin", "password": TEST_ADMIN_PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(body["data"]["expiresAt"].as_i64().unwrap() > 0);

    // The issued token opens a protected, forwarded route
    let response = client
        .get(format!("{}/api/core/items", gateway.url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn login_with_wrong_credentials_is_401() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/auth/login", gateway.url))
        .json(&json!({"username": "admin", "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_failure_envelope(&response.json().await.unwrap(), 401);
}

#[tokio::test]
async fn login_with_malformed_body_is_400() {
    let upstream = spawn_upstream().await;
    let gateway = spawn_gateway(test_config(&upstream.url, 1000, 60)).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/auth/login", gateway.url))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_failure_envelope(&response.json().await.unwrap(), 400);
}
