//! The admin router over the in-memory store, driven in-process.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;
use vip_admin::store::UserStore;
use vip_admin_core::query::UserListState;
use vip_admin_core::{StoredUser, UserRecord};
use vip_admin_integration_tests::{CONTAINER, USER_ID, memory_app};

const VALID_FORM: &str = "email=ana%40example.com&name=Ana&roles=admin\
&provider_ids=c1&category_ids=cat1&product_selection_ids=ps1&element_type_ids=vip&active=on";

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, location, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header("x-mc-user-id", USER_ID)
        .body(Body::empty())
        .unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("x-mc-user-id", USER_ID)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn stored_users(store: &impl UserStore) -> Vec<UserRecord> {
    let query = UserListState::new().to_query(CONTAINER);
    store
        .query_users(&query)
        .await
        .unwrap()
        .results
        .iter()
        .map(|stored: &StoredUser| stored.parse().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = memory_app();
    let (status, _, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _, _) = send(&app, get("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_then_list_resolves_labels() {
    let (app, store) = memory_app();

    let (status, location, _) = send(&app, post_form("/users", VALID_FORM)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/users"));
    assert_eq!(store.len(CONTAINER).await, 1);

    let (status, _, body) = send(&app, get("/users")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ana@example.com"));
    assert!(body.contains("Bar Norte"));
    assert!(body.contains("Zona VIP"));
    assert!(body.contains("Servicios VIP"));
}

#[tokio::test]
async fn test_invalid_form_is_rerendered_and_not_saved() {
    let (app, store) = memory_app();

    let (status, _, body) = send(&app, post_form("/users", "email=not-an-email&name=")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("Please enter a valid email address"));
    assert!(body.contains("Please enter a name"));
    assert!(body.contains("Select at least one role"));
    assert_eq!(store.len(CONTAINER).await, 0);
}

#[tokio::test]
async fn test_stale_update_conflicts() {
    let (app, store) = memory_app();
    send(&app, post_form("/users", VALID_FORM)).await;
    let user = stored_users(&store).await.remove(0);

    // First edit based on the loaded version wins.
    let form = format!("{VALID_FORM}&version={}", user.version);
    let (status, _, _) = send(&app, post_form(&format!("/users/{}", user.id), &form)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    // A second edit based on the same version is stale.
    let form = format!("{}&version={}", VALID_FORM.replace("name=Ana", "name=Other"), user.version);
    let (status, _, body) = send(&app, post_form(&format!("/users/{}", user.id), &form)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("modified elsewhere"));

    let saved = stored_users(&store).await.remove(0);
    assert_eq!(saved.value.name, "Ana");
    assert_eq!(saved.version, user.version + 1);
}

#[tokio::test]
async fn test_update_requires_version() {
    let (app, store) = memory_app();
    send(&app, post_form("/users", VALID_FORM)).await;
    let user = stored_users(&store).await.remove(0);

    let (status, _, _) = send(&app, post_form(&format!("/users/{}", user.id), VALID_FORM)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deactivate_and_filter_by_status() {
    let (app, store) = memory_app();
    send(&app, post_form("/users", VALID_FORM)).await;
    let user = stored_users(&store).await.remove(0);

    let form = format!("version={}&active=false", user.version);
    let (status, _, _) = send(&app, post_form(&format!("/users/{}/active", user.id), &form)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(!stored_users(&store).await.remove(0).value.active);

    let (_, _, body) = send(&app, get("/users?status=active")).await;
    assert!(!body.contains("ana@example.com"));
    let (_, _, body) = send(&app, get("/users?status=inactive")).await;
    assert!(body.contains("ana@example.com"));
}

#[tokio::test]
async fn test_edit_form_snapshot() {
    let (app, store) = memory_app();
    send(&app, post_form("/users", VALID_FORM)).await;
    let user = stored_users(&store).await.remove(0);

    let (status, _, body) = send(&app, get(&format!("/users/{}/edit", user.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&format!("name=\"version\" value=\"{}\"", user.version)));
    assert!(body.contains("ana@example.com"));
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let (app, _) = memory_app();
    let (status, _, _) = send(&app, get("/users/missing/edit")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_status_filter_is_rejected() {
    let (app, _) = memory_app();
    let (status, _, _) = send(&app, get("/users?status=sleeping")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_platform_screens_unavailable_on_memory_store() {
    let (app, _) = memory_app();
    for uri in ["/products", "/products/by-category", "/orders", "/orders/o1"] {
        let (status, _, _) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
    }
}

#[tokio::test]
async fn test_user_created_for_platform_id_is_found_on_welcome() {
    let (app, store) = memory_app();

    let (status, _, body) = send(&app, get("/users/new")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("name=\"platform_user_id\""));

    let form = format!("platform_user_id={USER_ID}&{}", VALID_FORM.replace("name=Ana", "name=Ana+Lopez"));
    let (status, _, _) = send(&app, post_form("/users", &form)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(stored_users(&store).await.remove(0).key.as_str(), USER_ID);

    let (status, _, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Ana Lopez"));
    assert!(!body.contains("No user record exists"));
}

#[tokio::test]
async fn test_user_created_without_platform_id_is_found_by_email() {
    let (app, _) = memory_app();
    send(&app, post_form("/users", VALID_FORM)).await;

    let request = Request::get("/")
        .header("x-mc-user-id", "mc-user-2")
        .header("x-mc-user-email", "ana@example.com")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("No user record exists"));
}

#[tokio::test]
async fn test_create_with_taken_key_conflicts() {
    let (app, store) = memory_app();
    send(&app, post_form("/users", VALID_FORM)).await;

    let again = VALID_FORM.replace("name=Ana", "name=Other");
    let (status, _, body) = send(&app, post_form("/users", &again)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already exists"));
    assert_eq!(store.len(CONTAINER).await, 1);
    assert_eq!(stored_users(&store).await.remove(0).value.name, "Ana");
}

#[tokio::test]
async fn test_search_matches_name_in_any_casing() {
    let (app, _) = memory_app();
    send(&app, post_form("/users", &VALID_FORM.replace("name=Ana", "name=Ana+Lopez"))).await;

    let (status, _, body) = send(&app, get("/users?search=ANA+LOPEZ")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ana@example.com"));
    assert!(body.contains("id=\"search-help\""));
}

#[tokio::test]
async fn test_welcome_without_record_shows_notice() {
    let (app, _) = memory_app();
    let (status, _, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No user record exists"));
}
