//! Get Cart slice

use axum::{Json, extract::State};
use tracing::info;

use crate::{
    domain::{CartServices, retry_on_conflict, with_deadline},
    infra::{ClientError, RequestDeadline, RequestIdentity},
};

use super::{CartError, CartView, CartViewResponse, Identity, refresh_cart, resolve_cart};

//------------------------- Web API ----------------------------

pub async fn get_cart_endpoint(
    State(services): State<CartServices>,
    RequestIdentity(identity): RequestIdentity,
    RequestDeadline(deadline): RequestDeadline,
) -> Result<Json<CartViewResponse>, ClientError> {
    let view = with_deadline(
        deadline,
        retry_on_conflict(|| get_cart(&services, &identity)),
    )
    .await?;
    Ok(Json(view.into()))
}

//----------------------- Implementation --------------------------

/// Reads the caller's cart. Lines pointing at products that are gone are dropped and the
/// cleaned cart is written back.
#[tracing::instrument(skip(services))]
pub async fn get_cart(services: &CartServices, identity: &Identity) -> Result<CartView, CartError> {
    let mut cart = resolve_cart(services.carts.as_ref(), identity).await?;
    let (view, dropped) =
        refresh_cart(services.catalog.as_ref(), &services.pricing, &mut cart).await?;

    if !dropped.is_empty() {
        services.carts.save(&mut cart).await?;
        info!("Purged {} unavailable line(s) from cart {}.", dropped.len(), cart.id());
    }

    Ok(view)
}

//-------------------------- Tests -------------------------------
