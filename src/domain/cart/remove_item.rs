//! Remove Item slice

use axum::{Json, extract::State};
use serde_aux::field_attributes::deserialize_bool_from_anything;

use crate::{
    domain::{CartServices, retry_on_conflict, with_deadline},
    infra::{ApiJson, ClientError, RequestDeadline, RequestIdentity},
};

use super::{CartError, CartView, CartViewResponse, Identity, ProductId, refresh_cart, resolve_cart};

//------------------------- Web API ----------------------------

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemPayload {
    #[serde(default)]
    pub product_id: String,
    #[serde(default, deserialize_with = "deserialize_bool_from_anything")]
    pub remove_all: bool,
}

pub async fn remove_item_endpoint(
    State(services): State<CartServices>,
    RequestIdentity(identity): RequestIdentity,
    RequestDeadline(deadline): RequestDeadline,
    ApiJson(payload): ApiJson<RemoveItemPayload>,
) -> Result<Json<CartViewResponse>, ClientError> {
    let command: RemoveItemCommand = payload.try_into()?;
    let view = with_deadline(
        deadline,
        retry_on_conflict(|| remove_item(&services, &identity, &command)),
    )
    .await?;
    Ok(Json(view.into()))
}

//------------------------- Command ----------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveItemCommand {
    pub product_id: ProductId,
    pub remove_all: bool,
}

impl TryFrom<RemoveItemPayload> for RemoveItemCommand {
    type Error = CartError;

    fn try_from(payload: RemoveItemPayload) -> Result<RemoveItemCommand, Self::Error> {
        Ok(Self {
            product_id: ProductId::parse(&payload.product_id)?,
            remove_all: payload.remove_all,
        })
    }
}

//----------------------- Implementation --------------------------

/// Takes one off the product's line, or the whole line when asked to or when it is the last one.
#[tracing::instrument(skip(services))]
pub async fn remove_item(
    services: &CartServices,
    identity: &Identity,
    command: &RemoveItemCommand,
) -> Result<CartView, CartError> {
    let mut cart = resolve_cart(services.carts.as_ref(), identity).await?;
    cart.remove_item(command.product_id, command.remove_all)?;

    let (view, _) = refresh_cart(services.catalog.as_ref(), &services.pricing, &mut cart).await?;
    services.carts.save(&mut cart).await?;
    Ok(view)
}

//-------------------------- Tests -------------------------------
