//! The derived cart view: lines with fresh product data plus totals. Never persisted.

use std::collections::HashMap;

use futures::future::try_join_all;
use rust_decimal::Decimal;
use tracing::warn;

use crate::{
    domain::stores::{ProductCatalog, StoreError},
    infra::PricingSettings,
};

use super::{
    Cart, CartId, CartLineItem, ItemId, Product, Quantity,
    pricing::{PricingLine, calculate_totals},
    resolve_product,
};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    #[serde(skip)]
    pub cart_id: CartId,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub cart_count: u64,
    pub items: Vec<CartViewItem>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CartViewItem {
    #[serde(rename = "_id")]
    pub id: ItemId,
    pub product: Product,
    pub quantity: Quantity,
}

/// What the HTTP layer sends back for every successful cart operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CartViewResponse {
    pub success: bool,
    #[serde(flatten)]
    pub view: CartView,
}

impl From<CartView> for CartViewResponse {
    fn from(view: CartView) -> Self {
        Self {
            success: true,
            view,
        }
    }
}

/// Resolves every line against the catalog, drops the lines whose product is gone or
/// malformed from `cart`, and prices what is left. The dropped lines are returned so the
/// caller can decide whether the cart needs saving.
pub async fn refresh_cart(
    catalog: &dyn ProductCatalog,
    pricing: &PricingSettings,
    cart: &mut Cart,
) -> Result<(CartView, Vec<CartLineItem>), StoreError> {
    let lookups = cart
        .items()
        .iter()
        .map(|line| resolve_product(catalog, line.product_id));
    let resolved: HashMap<_, _> = try_join_all(lookups)
        .await?
        .into_iter()
        .flatten()
        .map(|product| (product.id, product))
        .collect();

    let dropped = cart.retain_products(|product_id| resolved.contains_key(product_id));
    for line in &dropped {
        warn!(
            "Removing unavailable product {} from cart {}.",
            line.product_id,
            cart.id()
        );
    }

    let items: Vec<CartViewItem> = cart
        .items()
        .iter()
        .filter_map(|line| {
            resolved.get(&line.product_id).map(|product| CartViewItem {
                id: line.item_id,
                product: product.clone(),
                quantity: line.quantity,
            })
        })
        .collect();

    let pricing_lines: Vec<PricingLine> = items
        .iter()
        .map(|item| PricingLine {
            price: Some(item.product.price),
            quantity: item.quantity.get(),
        })
        .collect();
    let totals = calculate_totals(&pricing_lines, pricing);

    let view = CartView {
        cart_id: cart.id(),
        subtotal: totals.subtotal,
        shipping: totals.shipping,
        tax: totals.tax,
        total: totals.total,
        cart_count: totals.item_count,
        items,
    };
    Ok((view, dropped))
}
