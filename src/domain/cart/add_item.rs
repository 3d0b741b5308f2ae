//! Add Item slice

use axum::{Json, extract::State};
use serde_json::Value;

use crate::{
    domain::{CartServices, retry_on_conflict, with_deadline},
    infra::{ApiJson, ClientError, RequestDeadline, RequestIdentity},
};

use super::{
    CartError, CartView, CartViewResponse, Identity, ProductId, Quantity, refresh_cart,
    resolve_cart, resolve_product,
};

//------------------------- Web API ----------------------------

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemPayload {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: Option<Value>,
}

pub async fn add_item_endpoint(
    State(services): State<CartServices>,
    RequestIdentity(identity): RequestIdentity,
    RequestDeadline(deadline): RequestDeadline,
    ApiJson(payload): ApiJson<AddItemPayload>,
) -> Result<Json<CartViewResponse>, ClientError> {
    let command: AddItemCommand = payload.try_into()?;
    let view = with_deadline(
        deadline,
        retry_on_conflict(|| add_item(&services, &identity, &command)),
    )
    .await?;
    Ok(Json(view.into()))
}

//------------------------- Command ----------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddItemCommand {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl TryFrom<AddItemPayload> for AddItemCommand {
    type Error = CartError;

    fn try_from(payload: AddItemPayload) -> Result<Self, Self::Error> {
        let product_id = ProductId::parse(&payload.product_id)?;
        let quantity = match payload.quantity {
            None | Some(Value::Null) => Quantity::ONE,
            Some(value) => Quantity::from_json(&value)?,
        };
        Ok(Self {
            product_id,
            quantity,
        })
    }
}

//----------------------- Implementation --------------------------

/// Adds `quantity` of a product to the caller's cart, merging with an existing line.
#[tracing::instrument(skip(services))]
pub async fn add_item(
    services: &CartServices,
    identity: &Identity,
    command: &AddItemCommand,
) -> Result<CartView, CartError> {
    resolve_product(services.catalog.as_ref(), command.product_id)
        .await?
        .ok_or(CartError::ProductNotFound(command.product_id))?;

    let mut cart = resolve_cart(services.carts.as_ref(), identity).await?;
    cart.add_item(command.product_id, command.quantity)?;

    let (view, _) = refresh_cart(services.catalog.as_ref(), &services.pricing, &mut cart).await?;
    services.carts.save(&mut cart).await?;
    Ok(view)
}

//-------------------------- Tests -------------------------------
