use axum::http::{StatusCode, header};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use storefront_cart::{
    AppState,
    domain::{
        CartServices,
        stores::{PgSessionStore, SessionStore},
    },
    subsystems::build_router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::test_utils::{InMemoryApp, call, json_body, seed_product, session_cookie, test_settings};

const USER_HEADER: &str = "x-user-id";

#[tokio::test]
async fn a_guest_gets_a_session_cookie_and_keeps_their_cart() {
    let app = InMemoryApp::new();
    let router = app.router();
    let product = app.any_product().await;

    let first = call(&router, "GET", "/api/cart", &[], None).await;
    let cookie = session_cookie(&first).expect("A session cookie should be issued.");
    let set_cookie = first
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    call(
        &router,
        "POST",
        "/api/cart/add",
        &[("cookie", cookie.as_str())],
        Some(json!({ "productId": product, "quantity": 2 })),
    )
    .await;
    let again = call(&router, "GET", "/api/cart", &[("cookie", cookie.as_str())], None).await;
    let reissued = again.headers().contains_key(header::SET_COOKIE);
    let (status, body) = json_body(again).await;

    assert!(set_cookie.contains("HttpOnly"));
    assert!(!reissued, "an existing session should not get a new cookie");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartCount"], json!(2));
    assert_eq!(app.carts.len().await, 1);
}

#[tokio::test]
async fn a_session_id_the_server_never_issued_is_replaced() {
    let app = InMemoryApp::new();
    let router = app.router();
    let product = app.any_product().await;
    let made_up = "cart_session=00000000-0000-0000-0000-000000000001";

    let first = call(
        &router,
        "POST",
        "/api/cart/add",
        &[("cookie", made_up)],
        Some(json!({ "productId": product, "quantity": 3 })),
    )
    .await;
    let issued = session_cookie(&first).expect("A fresh session cookie should be issued.");
    let other_client = call(&router, "GET", "/api/cart", &[("cookie", made_up)], None).await;
    let other_issued = session_cookie(&other_client);
    let (_, other_body) = json_body(other_client).await;
    let (_, own_body) =
        json_body(call(&router, "GET", "/api/cart", &[("cookie", issued.as_str())], None).await).await;

    assert_ne!(issued, made_up);
    assert!(other_issued.is_some_and(|cookie| cookie != made_up && cookie != issued));
    assert_eq!(other_body["cartCount"], json!(0));
    assert_eq!(own_body["cartCount"], json!(3));
}

#[tokio::test]
async fn signed_in_users_are_identified_by_header() {
    let app = InMemoryApp::new();
    let router = app.router();
    let product = app.product(Decimal::new(10, 0)).await;
    let user = Uuid::now_v7().to_string();

    let (status, body) = json_body(
        call(
            &router,
            "POST",
            "/api/cart/add",
            &[(USER_HEADER, user.as_str())],
            Some(json!({ "productId": product, "quantity": "2" })),
        )
        .await,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "subtotal": 20.0,
            "shipping": 5.99,
            "tax": 2.0,
            "total": 27.99,
            "cartCount": 2,
            "items": [{
                "_id": body["items"][0]["_id"],
                "product": { "_id": product, "name": format!("Product {product}"), "price": 10.0 },
                "quantity": 2
            }]
        })
    );
}

#[tokio::test]
async fn removing_decrements_and_remove_all_clears_the_line() {
    let app = InMemoryApp::new();
    let router = app.router();
    let product = app.any_product().await;
    let user = Uuid::now_v7().to_string();
    let headers = [(USER_HEADER, user.as_str())];

    call(
        &router,
        "POST",
        "/api/cart/add",
        &headers,
        Some(json!({ "productId": product, "quantity": 3 })),
    )
    .await;
    let (_, decremented) = json_body(
        call(
            &router,
            "DELETE",
            "/api/cart/remove",
            &headers,
            Some(json!({ "productId": product })),
        )
        .await,
    )
    .await;
    let (_, cleared) = json_body(
        call(
            &router,
            "DELETE",
            "/api/cart/remove",
            &headers,
            Some(json!({ "productId": product, "removeAll": true })),
        )
        .await,
    )
    .await;
    let (status, missing) = json_body(
        call(
            &router,
            "DELETE",
            "/api/cart/remove",
            &headers,
            Some(json!({ "productId": product })),
        )
        .await,
    )
    .await;

    assert_eq!(decremented["items"][0]["quantity"], json!(2));
    assert_eq!(cleared["items"], json!([]));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["success"], json!(false));
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let app = InMemoryApp::new();
    let router = app.router();
    let product = app.any_product().await;
    let user = Uuid::now_v7().to_string();

    let bad_user = call(&router, "GET", "/api/cart", &[(USER_HEADER, "someone")], None).await;
    let bad_quantity = call(
        &router,
        "POST",
        "/api/cart/add",
        &[(USER_HEADER, user.as_str())],
        Some(json!({ "productId": product, "quantity": "abc" })),
    )
    .await;
    let not_json = call(
        &router,
        "POST",
        "/api/cart/add",
        &[(USER_HEADER, user.as_str()), ("content-type", "application/json")],
        None,
    )
    .await;

    let (bad_user_status, bad_user_body) = json_body(bad_user).await;
    let (bad_quantity_status, _) = json_body(bad_quantity).await;
    let (not_json_status, not_json_body) = json_body(not_json).await;

    assert_eq!(bad_user_status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_user_body["success"], json!(false));
    assert_eq!(bad_quantity_status, StatusCode::BAD_REQUEST);
    assert_eq!(not_json_status, StatusCode::BAD_REQUEST);
    assert_eq!(not_json_body["success"], json!(false));
}

#[tokio::test]
async fn guests_fail_loudly_when_sessions_are_disabled() {
    let mut settings = test_settings();
    settings.session.enabled = false;
    let app = InMemoryApp::with_settings(settings);
    let router = app.router();

    let guest = call(&router, "GET", "/api/cart", &[], None).await;
    let issued = guest.headers().contains_key(header::SET_COOKIE);
    let (status, body) = json_body(guest).await;
    let user_id = Uuid::now_v7().to_string();
    let user = call(&router, "GET", "/api/cart", &[(USER_HEADER, user_id.as_str())], None).await;

    assert!(!issued);
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert_eq!(user.status(), StatusCode::OK);
}

#[tokio::test]
async fn signing_in_and_merging_moves_the_guest_cart() {
    let app = InMemoryApp::new();
    let router = app.router();
    let product = app.any_product().await;

    let first = call(
        &router,
        "POST",
        "/api/cart/add",
        &[],
        Some(json!({ "productId": product, "quantity": 2 })),
    )
    .await;
    let cookie = session_cookie(&first).expect("A session cookie should be issued.");
    let user = Uuid::now_v7().to_string();
    let signed_in = [(USER_HEADER, user.as_str()), ("cookie", cookie.as_str())];

    let (before_status, before) =
        json_body(call(&router, "GET", "/api/cart", &signed_in, None).await).await;
    let (merge_status, merged) =
        json_body(call(&router, "POST", "/api/cart/merge", &signed_in, None).await).await;
    let (_, guest_after) =
        json_body(call(&router, "GET", "/api/cart", &[("cookie", cookie.as_str())], None).await).await;

    assert_eq!(before_status, StatusCode::OK);
    assert_eq!(before["cartCount"], json!(0));
    assert_eq!(merge_status, StatusCode::OK);
    assert_eq!(merged["cartCount"], json!(2));
    assert_eq!(guest_after["cartCount"], json!(0));
}

#[sqlx::test]
async fn the_router_works_against_postgres(pool: PgPool) {
    let settings = test_settings();
    let sessions: Arc<dyn SessionStore> =
        Arc::new(PgSessionStore::new(pool.clone(), settings.session.ttl()));
    let state = AppState {
        services: CartServices::postgres(&pool, settings.pricing.clone()),
        settings,
        pool: pool.clone(),
        sessions,
    };
    let router = build_router(state).expect("Router should build.");
    let product = seed_product(&pool, Some(Decimal::new(30, 0))).await;
    let gone = seed_product(&pool, Some(Decimal::new(25, 0))).await;
    let user = Uuid::now_v7().to_string();
    let headers = [(USER_HEADER, user.as_str())];

    for product_id in [product, gone] {
        call(
            &router,
            "POST",
            "/api/cart/add",
            &headers,
            Some(json!({ "productId": product_id })),
        )
        .await;
    }
    sqlx::query("DELETE FROM products WHERE product_id = $1")
        .bind(gone)
        .execute(&pool)
        .await
        .expect("Product should be deleted.");

    let (status, body) = json_body(call(&router, "GET", "/api/cart", &headers, None).await).await;
    let stored_lines: i64 =
        sqlx::query_scalar("SELECT jsonb_array_length(items)::bigint FROM carts")
            .fetch_one(&pool)
            .await
            .expect("Cart should be stored.");

    pool.close().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartCount"], json!(1));
    assert_eq!(body["total"], json!(38.99));
    assert_eq!(stored_lines, 1);
}
