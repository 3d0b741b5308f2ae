//! Merge Carts slice: folds a guest's session cart into their account cart after sign in.

use axum::{Json, extract::State};
use tracing::info;

use crate::{
    domain::{CartServices, retry_on_conflict, with_deadline},
    infra::{ClientError, RequestDeadline, RequestIdentity},
};

use super::{
    CartError, CartOwner, CartView, CartViewResponse, Identity, identity::find_or_create,
    refresh_cart,
};

//------------------------- Web API ----------------------------

pub async fn merge_carts_endpoint(
    State(services): State<CartServices>,
    RequestIdentity(identity): RequestIdentity,
    RequestDeadline(deadline): RequestDeadline,
) -> Result<Json<CartViewResponse>, ClientError> {
    let view = with_deadline(
        deadline,
        retry_on_conflict(|| merge_guest_cart(&services, &identity)),
    )
    .await?;
    Ok(Json(view.into()))
}

//----------------------- Implementation --------------------------

/// Moves the session cart's lines into the user's cart, summing quantities on shared
/// products. Saving the user cart and deleting the guest cart happen in one store write.
/// Without a session, or with nothing bound to it, the user's cart is refreshed and returned.
#[tracing::instrument(skip(services))]
pub async fn merge_guest_cart(
    services: &CartServices,
    identity: &Identity,
) -> Result<CartView, CartError> {
    let user_id = identity.user_id.ok_or(CartError::NotAuthenticated)?;
    let mut user_cart = find_or_create(services.carts.as_ref(), CartOwner::User(user_id)).await?;

    let guest_cart = match &identity.session {
        Some(session) => match session.cart_id().await? {
            Some(cart_id) => services
                .carts
                .find_by_id(cart_id)
                .await?
                .filter(|cart| cart.owner() == CartOwner::Session(session.session_id())),
            None => None,
        },
        None => None,
    };

    let Some(guest_cart) = guest_cart else {
        let (view, dropped) =
            refresh_cart(services.catalog.as_ref(), &services.pricing, &mut user_cart).await?;
        if !dropped.is_empty() {
            services.carts.save(&mut user_cart).await?;
        }
        return Ok(view);
    };

    user_cart.absorb(&guest_cart)?;
    let (view, _) =
        refresh_cart(services.catalog.as_ref(), &services.pricing, &mut user_cart).await?;
    services
        .carts
        .save_merged(&mut user_cart, guest_cart.id())
        .await?;
    // The binding now points at a deleted cart, which resolves as no guest cart.
    if let Some(session) = &identity.session {
        session.clear().await?;
    }

    info!(
        "Merged guest cart {} into cart {} for user {user_id}.",
        guest_cart.id(),
        user_cart.id()
    );
    Ok(view)
}

//-------------------------- Tests -------------------------------
