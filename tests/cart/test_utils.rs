use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use fake::Fake;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use storefront_cart::{
    AppState, construct_app_state,
    domain::{
        CartServices,
        cart::ProductId,
        fake::Price,
        stores::{InMemoryCartStore, InMemoryProductCatalog, InMemorySessionStore, ProductRecord},
    },
    infra::{Settings, get_config_settings},
    start_server,
    subsystems::build_router,
};
use tokio::task::JoinHandle;
use tower::ServiceExt;

pub async fn start_test_server(
    connect_options: PgConnectOptions,
) -> (JoinHandle<Result<(), anyhow::Error>>, AppState) {
    let mut settings = get_config_settings().expect("Could not read application configuration.");
    settings.database.database_name = connect_options
        .get_database()
        .expect("Expected database name.")
        .into();
    let app_state = construct_app_state(settings)
        .await
        .expect("Expected AppState to be created.");
    let server_handle = tokio::task::spawn(start_server(app_state.clone()));

    // Give the listener a moment to bind before the first request.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    (server_handle, app_state)
}

/// Inserts a product straight into the catalog table.
pub async fn seed_product(pool: &PgPool, price: Option<Decimal>) -> ProductId {
    let product_id = ProductId::new();
    sqlx::query("INSERT INTO products (product_id, name, price) VALUES ($1, $2, $3)")
        .bind(product_id)
        .bind(format!("Product {product_id}"))
        .bind(price)
        .execute(pool)
        .await
        .expect("Product should be inserted.");
    product_id
}

/// Application state backed entirely by in-memory stores. The pool is never connected.
pub struct InMemoryApp {
    pub state: AppState,
    pub catalog: Arc<InMemoryProductCatalog>,
    pub carts: Arc<InMemoryCartStore>,
}

impl InMemoryApp {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let pool = PgPoolOptions::new().connect_lazy_with(settings.database.with_db_name());
        let catalog = Arc::new(InMemoryProductCatalog::new());
        let carts = Arc::new(InMemoryCartStore::new());
        let services = CartServices::new(carts.clone(), catalog.clone(), settings.pricing.clone());
        let sessions = Arc::new(InMemorySessionStore::new(settings.session.ttl()));
        Self {
            state: AppState {
                settings,
                pool,
                services,
                sessions,
            },
            catalog,
            carts,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone()).expect("Router should build.")
    }

    pub async fn product(&self, price: Decimal) -> ProductId {
        let product_id = ProductId::new();
        self.catalog
            .insert(ProductRecord {
                product_id,
                name: format!("Product {product_id}"),
                price: Some(price),
            })
            .await;
        product_id
    }

    pub async fn any_product(&self) -> ProductId {
        self.product(Price.fake()).await
    }
}

pub fn test_settings() -> Settings {
    get_config_settings().expect("Could not read application configuration.")
}

/// Sends one request through the router. A JSON body sets the content type.
pub async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    router
        .clone()
        .oneshot(builder.body(body).expect("Request should build."))
        .await
        .expect("Router should respond.")
}

pub async fn json_body(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Body should be readable.");
    let json = serde_json::from_slice(&bytes).expect("Body should be JSON.");
    (status, json)
}

/// The session cookie pair (`name=value`) from a response's `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_owned)
}
