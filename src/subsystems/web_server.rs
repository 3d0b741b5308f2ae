use std::net::SocketAddr;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    Json, Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use futures::FutureExt;
use tokio::select;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemHandle};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    AppState,
    domain::cart::{
        add_item_endpoint, get_cart_endpoint, merge_carts_endpoint, remove_item_endpoint,
    },
    infra::{ClientError, REQUEST_TIMEOUT_HEADER, session_middleware},
};

pub struct WebServer {
    state: AppState,
}

impl WebServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl IntoSubsystem<anyhow::Error> for WebServer {
    async fn run(self, subsys: SubsystemHandle) -> Result<(), anyhow::Error> {
        let address = self.state.settings.application.address();
        let socket_addr: SocketAddr = address.parse()
            .inspect_err(|e| error!("Could not parse server address {address}.\nCheck application host and port in configuration settings.\nFailed with {e}"))?;

        let router = build_router(self.state)?;

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .inspect_err(|e| {
                error!("Could not bind socket address {socket_addr}. Failed with {e}")
            })?;

        info!("Web server starting on http://{socket_addr}");
        select!(
            result = axum::serve(listener, router.into_make_service()).into_future().map(|result| result.map_err(anyhow::Error::new)) => {
                error!("Web server completed with {result:?}");
            }
            _ = subsys.on_shutdown_requested() => {
                info!("Web server shutdown");
            }
        );
        Ok(())
    }
}

/// All HTTP routes. Guest sessions are only issued on cart routes, and only when sessions
/// are enabled.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let mut cart_routes = Router::new()
        .route("/api/cart", get(get_cart_endpoint))
        .route("/api/cart/add", post(add_item_endpoint))
        .route("/api/cart/remove", delete(remove_item_endpoint))
        .route("/api/cart/merge", post(merge_carts_endpoint));

    if state.settings.session.enabled {
        cart_routes = cart_routes.layer(from_fn_with_state(state.clone(), session_middleware));
    } else {
        warn!("Sessions are disabled. Guest carts are unavailable.");
    }

    let cors = cors_layer(&state)?;

    Ok(Router::new()
        .merge(cart_routes)
        .route("/healthcheck", get(health_check_endpoint))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn cors_layer(state: &AppState) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = state
        .settings
        .application
        .client_origin
        .parse()
        .context("Invalid client_origin in application settings.")?;
    let user_header: HeaderName = state
        .settings
        .session
        .user_header
        .parse()
        .context("Invalid user_header in session settings.")?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            user_header,
            HeaderName::from_static(REQUEST_TIMEOUT_HEADER),
        ]))
}

pub async fn health_check_endpoint() -> Result<Json<String>, ClientError> {
    Ok(Json("Ok".to_owned()))
}
