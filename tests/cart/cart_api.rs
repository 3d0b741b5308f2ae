use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;
use serial_test::serial;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::test_utils::{seed_product, start_test_server};

#[sqlx::test]
#[serial]
async fn a_guest_can_build_a_cart_over_several_requests(
    _pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let (_, app_state) = start_test_server(connect_options.clone()).await;
    let shoes = seed_product(&app_state.pool, Some(Decimal::new(30, 0))).await;
    let socks = seed_product(&app_state.pool, Some(Decimal::new(25, 0))).await;

    let url = format!("http://{}", app_state.settings.application.address());
    let client = httpc_test::new_client(url).expect("Expected client to be created.");

    let health = client.do_get("/healthcheck").await.expect("Health check should succeed.");
    let empty = client.do_get("/api/cart").await.expect("Get should succeed.");
    let empty_status = empty.status();
    let empty_body = empty.json_body().expect("Body should be JSON.");
    let session = client.cookie_value("cart_session");

    client
        .do_post("/api/cart/add", json!({ "productId": shoes }))
        .await
        .expect("Add should succeed.");
    let added = client
        .do_post("/api/cart/add", json!({ "productId": socks, "quantity": "1" }))
        .await
        .expect("Add should succeed.");
    let added_status = added.status();
    let cart = client
        .do_get("/api/cart")
        .await
        .expect("Get should succeed.")
        .json_body()
        .expect("Body should be JSON.");

    app_state.pool.close().await;

    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(empty_status, StatusCode::OK);
    assert_eq!(empty_body["success"], json!(true));
    assert_eq!(empty_body["cartCount"], json!(0));
    assert!(session.is_some(), "a session cookie should be issued");
    assert_eq!(added_status, StatusCode::OK);
    assert_eq!(cart["cartCount"], json!(2));
    assert_eq!(cart["subtotal"], json!(55.0));
    assert_eq!(cart["shipping"], json!(0.0));
    assert_eq!(cart["tax"], json!(5.5));
    assert_eq!(cart["total"], json!(60.5));
    assert_eq!(cart["items"][0]["product"]["_id"], json!(shoes));
    assert_eq!(cart["items"][1]["product"]["_id"], json!(socks));
}

#[sqlx::test]
#[serial]
async fn invalid_requests_are_rejected_with_an_error_body(
    _pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let (_, app_state) = start_test_server(connect_options.clone()).await;
    let product = seed_product(&app_state.pool, Some(Decimal::new(10, 0))).await;
    let unpriced = seed_product(&app_state.pool, None).await;

    let url = format!("http://{}", app_state.settings.application.address());
    let client = httpc_test::new_client(url).expect("Expected client to be created.");

    let zero = client
        .do_post("/api/cart/add", json!({ "productId": product, "quantity": 0 }))
        .await
        .expect("Request should complete.");
    let bad_id = client
        .do_post("/api/cart/add", json!({ "productId": "not-a-uuid" }))
        .await
        .expect("Request should complete.");
    let unknown = client
        .do_post("/api/cart/add", json!({ "productId": uuid::Uuid::now_v7() }))
        .await
        .expect("Request should complete.");
    let no_price = client
        .do_post("/api/cart/add", json!({ "productId": unpriced }))
        .await
        .expect("Request should complete.");
    let merge = client
        .do_post("/api/cart/merge", json!({}))
        .await
        .expect("Request should complete.");

    app_state.pool.close().await;

    assert_eq!(zero.status(), StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(no_price.status(), StatusCode::NOT_FOUND);
    assert_eq!(merge.status(), StatusCode::UNAUTHORIZED);
    let body = zero.json_body().expect("Body should be JSON.");
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
}
