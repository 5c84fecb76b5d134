//! User screens of a running admin server.
//!
//! These tests require:
//! - The admin server running (cargo run -p vip-admin)
//! - Valid commercetools credentials in its environment
//!
//! Run with: cargo test -p vip-admin-integration-tests -- --ignored

use reqwest::{Client, StatusCode, redirect::Policy};
use uuid::Uuid;
use vip_admin_integration_tests::{USER_ID, admin_base_url};

/// Client that keeps redirects visible and sends the proxy identity headers.
fn client() -> Client {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("x-mc-user-id", reqwest::header::HeaderValue::from_static(USER_ID));
    Client::builder()
        .redirect(Policy::none())
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running admin server and commercetools credentials"]
async fn test_health_ready() {
    let base_url = admin_base_url();
    let resp = client()
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to call readiness");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running admin server and commercetools credentials"]
async fn test_user_list_filters() {
    let base_url = admin_base_url();
    let client = client();

    for query in ["", "?status=active", "?role=admin", "?search=example&per_page=20&page=2"] {
        let resp = client
            .get(format!("{base_url}/users{query}"))
            .send()
            .await
            .expect("Failed to get users list");
        assert_eq!(resp.status(), StatusCode::OK, "{query}");
    }
}

#[tokio::test]
#[ignore = "Requires running admin server and commercetools credentials"]
async fn test_user_create_validation() {
    let base_url = admin_base_url();
    let resp = client()
        .post(format!("{base_url}/users"))
        .form(&[("email", "nope"), ("name", "")])
        .send()
        .await
        .expect("Failed to submit form");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Please enter a valid email address"));
}

#[tokio::test]
#[ignore = "Requires running admin server and commercetools credentials"]
async fn test_user_create() {
    let base_url = admin_base_url();
    let email = format!("integration-test-{}@example.com", Uuid::new_v4());

    let resp = client()
        .post(format!("{base_url}/users"))
        .form(&[
            ("email", email.as_str()),
            ("name", "Integration Test"),
            ("roles", "user"),
            ("provider_ids", "integration-provider"),
            ("category_ids", "integration-category"),
            ("product_selection_ids", "integration-selection"),
        ])
        .send()
        .await
        .expect("Failed to create user");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client()
        .get(format!("{base_url}/users?search={email}"))
        .send()
        .await
        .expect("Failed to search users");
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains(&email));
}

#[tokio::test]
#[ignore = "Requires running admin server and commercetools credentials"]
async fn test_orders_and_products_render() {
    let base_url = admin_base_url();
    let client = client();

    for path in ["/orders", "/products", "/products/by-provider?provider=vip"] {
        let resp = client
            .get(format!("{base_url}{path}"))
            .send()
            .await
            .expect("Failed to get page");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}
